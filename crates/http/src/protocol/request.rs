//! Parsed HTTP request.
//!
//! A [`Request`] never owns memory: every slice borrows the per-request
//! [`Arena`](crate::arena::Arena) the header block and body were copied into,
//! so it stays valid until the arena is cleared and no longer.

use crate::protocol::Method;

/// A request decoded from the connection buffer.
///
/// Only the fields the server acts on are extracted: the method, the path,
/// and the `Accept-Encoding`, `Content-Length` and `User-Agent` headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Request<'a> {
    raw: &'a [u8],
    method: Method,
    path: &'a str,
    user_agent: &'a [u8],
    content_length: u64,
    headers_len: usize,
    accepts_gzip: bool,
    body: &'a [u8],
}

impl<'a> Request<'a> {
    pub(crate) fn new(raw: &'a [u8]) -> Self {
        Self { raw, ..Default::default() }
    }

    /// The raw header block, request line included.
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The request target as received, or its canonical form once
    /// [`set_path`](Self::set_path) has been called.
    pub fn path(&self) -> &'a str {
        self.path
    }

    /// Value of the `User-Agent` header, empty when absent.
    pub fn user_agent(&self) -> &'a [u8] {
        self.user_agent
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Length of the header block including the terminating blank line.
    pub fn headers_len(&self) -> usize {
        self.headers_len
    }

    /// Whether `Accept-Encoding` listed `gzip`.
    pub fn accepts_gzip(&self) -> bool {
        self.accepts_gzip
    }

    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    /// Replaces the path, typically with its canonical form.
    pub fn set_path(&mut self, path: &'a str) {
        self.path = path;
    }

    pub(crate) fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub(crate) fn set_user_agent(&mut self, user_agent: &'a [u8]) {
        self.user_agent = user_agent;
    }

    pub(crate) fn set_content_length(&mut self, content_length: u64) {
        self.content_length = content_length;
    }

    pub(crate) fn set_headers_len(&mut self, headers_len: usize) {
        self.headers_len = headers_len;
    }

    pub(crate) fn enable_gzip(&mut self) {
        self.accepts_gzip = true;
    }

    pub(crate) fn set_body(&mut self, body: &'a [u8]) {
        self.body = body;
    }
}
