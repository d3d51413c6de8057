//! Request methods recognized on the request line.

use std::fmt;

/// An HTTP request method.
///
/// Only the nine methods of RFC 9110 are recognized; any other token on the
/// request line maps to [`Method::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
    #[default]
    Unknown,
}

/// Wire names, matched case-sensitively.
const METHODS: [(Method, &str); 9] = [
    (Method::Connect, "CONNECT"),
    (Method::Delete, "DELETE"),
    (Method::Get, "GET"),
    (Method::Head, "HEAD"),
    (Method::Options, "OPTIONS"),
    (Method::Patch, "PATCH"),
    (Method::Post, "POST"),
    (Method::Put, "PUT"),
    (Method::Trace, "TRACE"),
];

impl Method {
    /// Maps a method token to its variant.
    pub fn from_bytes(token: &[u8]) -> Self {
        METHODS.iter().find(|(_, name)| name.as_bytes() == token).map_or(Method::Unknown, |(method, _)| *method)
    }

    pub fn as_str(&self) -> &'static str {
        METHODS.iter().find(|(method, _)| method == self).map_or("UNKNOWN", |(_, name)| *name)
    }

    /// GET and HEAD are the only methods the server answers with content.
    #[inline]
    pub fn is_get_or_head(&self) -> bool {
        matches!(self, Method::Get | Method::Head)
    }

    #[inline]
    pub fn is_head(&self) -> bool {
        matches!(self, Method::Head)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
