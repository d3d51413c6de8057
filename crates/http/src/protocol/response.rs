use http::StatusCode;

use crate::protocol::ContentType;

/// The outcome of handling one request, before serialization.
///
/// Like [`Request`](crate::protocol::Request), a reply only borrows: its body
/// and location live in the per-request arena or in static memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply<'a> {
    status: StatusCode,
    content_type: ContentType,
    gzip: bool,
    location: Option<&'a str>,
    body: &'a [u8],
}

impl<'a> Reply<'a> {
    /// A reply with the given status and no body.
    pub fn new(status: StatusCode) -> Self {
        Self { status, content_type: ContentType::default(), gzip: false, location: None, body: &[] }
    }

    /// A `200 OK` reply carrying `body`.
    pub fn ok(content_type: ContentType, body: &'a [u8]) -> Self {
        Self::new(StatusCode::OK).with_body(content_type, body)
    }

    /// A `301 Moved Permanently` reply pointing at `location`.
    pub fn redirect(location: &'a str) -> Self {
        Self { location: Some(location), ..Self::new(StatusCode::MOVED_PERMANENTLY) }
    }

    #[must_use]
    pub fn with_body(self, content_type: ContentType, body: &'a [u8]) -> Self {
        Self { content_type, body, ..self }
    }

    /// Swaps the body for its gzip-compressed form.
    #[must_use]
    pub fn with_gzip_body(self, body: &'a [u8]) -> Self {
        Self { gzip: true, body, ..self }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Whether the body is gzip-encoded.
    pub fn is_gzip(&self) -> bool {
        self.gzip
    }

    pub fn location(&self) -> Option<&'a str> {
        self.location
    }

    pub fn body(&self) -> &'a [u8] {
        self.body
    }
}
