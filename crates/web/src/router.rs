//! Request dispatch for the strand origin server.
//!
//! Routes are tried in a fixed order against the canonical path:
//!
//! 1. `/user-agent` echoes the `User-Agent` header; `/user-agent/` redirects to it
//! 2. `/echo/<text>` echoes `<text>`; a bare `/echo` redirects to `/echo/`
//! 3. anything else is looked up below the serve root
//!
//! Only `GET` and `HEAD` are served. A `404` carries the content of
//! `/404.html` when the serve root has one. Successful replies are gzip
//! encoded when the client accepts it and the encoded body is smaller.

use std::path::PathBuf;

use http::StatusCode;
use strand_http::arena::Arena;
use strand_http::handler::Handler;
use strand_http::path::canonicalize;
use strand_http::protocol::{AllocError, ContentType, Method, PathError, Reply, Request};
use thiserror::Error;
use tracing::{error, warn};

use crate::encoding::{Compressor, Gzip};
use crate::fs::{FileKind, FileSystem, FsError, ServeDir, content_type_for};

const USER_AGENT: &str = "/user-agent";
const ECHO: &str = "/echo";
const ECHO_PREFIX: &str = "/echo/";
const INDEX: &str = "index.html";
const NOT_FOUND_PAGE: &str = "/404.html";

/// Why a request could not be served normally.
#[derive(Debug, Error)]
enum RouteError {
    #[error("bad request")]
    BadRequest,

    #[error("not found")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Internal(String),
}

impl From<PathError> for RouteError {
    fn from(e: PathError) -> Self {
        match e {
            PathError::Invalid => Self::BadRequest,
            PathError::Alloc { source } => source.into(),
        }
    }
}

impl From<AllocError> for RouteError {
    fn from(e: AllocError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<FsError> for RouteError {
    fn from(e: FsError) -> Self {
        Self::Internal(e.detail().to_owned())
    }
}

fn ensure_get_or_head(method: Method) -> Result<(), RouteError> {
    if method.is_get_or_head() { Ok(()) } else { Err(RouteError::MethodNotAllowed) }
}

/// The request handler of the origin server.
#[derive(Debug)]
pub struct Router<F = ServeDir, C = Gzip> {
    fs: F,
    compressor: C,
}

impl Router {
    /// Serves files below `root`, gzip encoding at the default level.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with(ServeDir::new(root), Gzip::default())
    }
}

impl<F, C> Router<F, C>
where
    F: FileSystem,
    C: Compressor,
{
    pub fn with(fs: F, compressor: C) -> Self {
        Self { fs, compressor }
    }

    fn route<'a>(&self, request: &mut Request<'a>, arena: &'a Arena) -> Result<Reply<'a>, RouteError> {
        let path = canonicalize(request.path(), arena)?;
        request.set_path(path);

        if let Some(rest) = path.strip_prefix(USER_AGENT).filter(|rest| rest.is_empty() || *rest == "/") {
            ensure_get_or_head(request.method())?;
            return Ok(if rest.is_empty() {
                Reply::ok(ContentType::TextPlain, request.user_agent())
            } else {
                Reply::redirect(USER_AGENT)
            });
        }

        if path == ECHO {
            ensure_get_or_head(request.method())?;
            return Ok(Reply::redirect(ECHO_PREFIX));
        }

        if let Some(message) = path.strip_prefix(ECHO_PREFIX) {
            ensure_get_or_head(request.method())?;
            return Ok(Reply::ok(ContentType::TextPlain, message.as_bytes()));
        }

        ensure_get_or_head(request.method())?;
        self.serve_file(path, arena)
    }

    fn serve_file<'a>(&self, path: &'a str, arena: &'a Arena) -> Result<Reply<'a>, RouteError> {
        match self.fs.classify(path)? {
            FileKind::Absent => Err(RouteError::NotFound),
            FileKind::Directory if !path.ends_with('/') => Ok(Reply::redirect(arena.alloc_concat(&[path, "/"])?)),
            FileKind::Directory => {
                let index = arena.alloc_concat(&[path, INDEX])?;
                let body = self.fs.read(index, arena)?.ok_or(RouteError::NotFound)?;
                Ok(Reply::ok(ContentType::TextHtml, body))
            }
            FileKind::File => match path.strip_suffix(INDEX).filter(|dir| dir.ends_with('/')) {
                Some(dir) => Ok(Reply::redirect(dir)),
                None => {
                    let body = self.fs.read(path, arena)?.ok_or(RouteError::NotFound)?;
                    Ok(Reply::ok(content_type_for(path), body))
                }
            },
        }
    }

    fn error_reply<'a>(&self, e: RouteError, arena: &'a Arena) -> Reply<'a> {
        match e {
            RouteError::BadRequest => Reply::new(StatusCode::BAD_REQUEST),
            RouteError::MethodNotAllowed => Reply::new(StatusCode::METHOD_NOT_ALLOWED),
            RouteError::NotFound => match self.fs.read(NOT_FOUND_PAGE, arena) {
                Ok(Some(body)) => Reply::new(StatusCode::NOT_FOUND).with_body(ContentType::TextHtml, body),
                Ok(None) => Reply::new(StatusCode::NOT_FOUND),
                Err(e) => internal_error(e.detail(), arena),
            },
            RouteError::Internal(detail) => internal_error(&detail, arena),
        }
    }

    /// Swaps in a gzip body when the client accepts it and it saves space.
    fn negotiate<'a>(&self, reply: Reply<'a>, request: &Request<'a>, arena: &'a Arena) -> Reply<'a> {
        if reply.status() != StatusCode::OK || reply.body().is_empty() || !request.accepts_gzip() {
            return reply;
        }

        let Some(compressed) = self.compressor.compress(reply.body()) else {
            return reply;
        };
        if compressed.len() >= reply.body().len() {
            return reply;
        }

        match arena.alloc_slice_copy(&compressed) {
            Ok(body) => reply.with_gzip_body(body),
            Err(e) => {
                warn!(cause = %e, "no room for compressed body, sending identity");
                reply
            }
        }
    }
}

fn internal_error<'a>(detail: &str, arena: &'a Arena) -> Reply<'a> {
    error!(detail, "internal server error");
    let reply = Reply::new(StatusCode::INTERNAL_SERVER_ERROR);
    match arena.alloc_str(detail) {
        Ok(body) => reply.with_body(ContentType::TextPlain, body.as_bytes()),
        Err(_) => reply,
    }
}

impl<F, C> Handler for Router<F, C>
where
    F: FileSystem,
    C: Compressor,
{
    fn call<'a>(&self, request: &mut Request<'a>, arena: &'a Arena) -> Reply<'a> {
        let reply = self.route(request, arena).unwrap_or_else(|e| self.error_reply(e, arena));
        self.negotiate(reply, request, arena)
    }
}
