use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use once_cell::sync::OnceCell;

/// The status, headers and buffered body of a response, as seen by a status handler.
///
/// The body text is decoded on first access (invalid UTF-8 is replaced) and cached.
#[derive(Debug, Clone)]
pub struct ResponseStatus {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    text: OnceCell<String>,
}

impl ResponseStatus {
    /// A status carrying the fully buffered response body.
    pub fn with_body(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self { status, headers, body, text: OnceCell::new() }
    }

    /// A status for a response that had nothing to buffer, its text is always empty.
    pub fn without_body(status: StatusCode, headers: HeaderMap) -> Self {
        Self { status, headers, body: Bytes::new(), text: OnceCell::with_value(String::new()) }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn body_as_text(&self) -> &str {
        self.text.get_or_init(|| String::from_utf8_lossy(&self.body).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_decoded_lazily() {
        let status = ResponseStatus::with_body(StatusCode::NOT_FOUND, HeaderMap::new(), Bytes::from_static(b"no such item"));

        assert!(status.text.get().is_none());
        assert_eq!(status.body_as_text(), "no such item");
        assert_eq!(status.text.get().map(String::as_str), Some("no such item"));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let status = ResponseStatus::with_body(StatusCode::BAD_REQUEST, HeaderMap::new(), Bytes::from_static(b"bad \xff byte"));

        assert_eq!(status.body_as_text(), "bad \u{fffd} byte");
    }

    #[test]
    fn without_body_is_empty() {
        let status = ResponseStatus::without_body(StatusCode::INTERNAL_SERVER_ERROR, HeaderMap::new());

        assert_eq!(status.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(status.body().is_empty());
        assert_eq!(status.body_as_text(), "");
    }
}
