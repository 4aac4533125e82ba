use micro_transport::protocol::body::RequestBody;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A request body shared by every clone of a request, handed to the transport at most once.
#[derive(Clone)]
pub(crate) struct OnceBody {
    inner: Arc<Mutex<Option<RequestBody>>>,
}

impl From<RequestBody> for OnceBody {
    fn from(body: RequestBody) -> Self {
        OnceBody { inner: Arc::new(Mutex::new(Some(body))) }
    }
}

impl OnceBody {
    /// Takes the body out, `None` once it has been taken.
    pub(crate) async fn take(&self) -> Option<RequestBody> {
        let mut guard = self.inner.lock().await;
        guard.take()
    }
}

impl fmt::Debug for OnceBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OnceBody")
    }
}
