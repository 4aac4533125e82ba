use async_trait::async_trait;
use http::{Request, Response, StatusCode};
use micro_transport::protocol::TransportError;
use micro_transport::protocol::body::{RequestBody, ResponseBody};
use micro_transport::transport::Transport;
use mockall::mock;
use std::time::Duration;

mock! {
    pub Transport {}

    #[async_trait]
    impl Transport for Transport {
        async fn issue(
            &self,
            request: Request<Option<RequestBody>>,
            timeout: Option<Duration>,
        ) -> Result<Response<ResponseBody>, TransportError>;
    }
}

pub(crate) fn response_of(status: StatusCode, body: ResponseBody) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
}
