use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("request size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeRequest { current_size: usize, max_size: usize },

    #[error("arena error: {source}")]
    Alloc {
        #[from]
        source: AllocError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_request(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeRequest { current_size, max_size }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// Whether the connection can still carry a reply explaining the failure.
    pub fn is_answerable(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Failure to carve memory out of an [`Arena`](crate::arena::Arena).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    #[error("out of memory while allocating an arena region of {size} bytes")]
    OutOfMemory { size: usize },

    #[error("unsupported allocation of {size} bytes aligned to {align}")]
    Unsupported { size: usize, align: usize },
}

/// Rejection of a request path by [`canonicalize`](crate::path::canonicalize).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid request path")]
    Invalid,

    #[error("arena error: {source}")]
    Alloc {
        #[from]
        source: AllocError,
    },
}
