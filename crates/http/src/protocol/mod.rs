//! Core HTTP protocol types shared by the codec, the connection and handlers.
//!
//! # Architecture
//!
//! - **Methods** ([`Method`]): the nine recognized request methods plus an
//!   `Unknown` sentinel
//! - **Media types** ([`ContentType`]): the fixed set of `Content-Type` values
//!   the server emits
//! - **Request Processing** ([`Request`]): the fields extracted from a request,
//!   borrowed from the per-request arena
//! - **Response Processing** ([`Reply`]): status, body and metadata produced by
//!   a handler, consumed by the response encoder
//! - **Error Handling** ([`HttpError`], [`ParseError`], [`SendError`],
//!   [`AllocError`], [`PathError`])
//!
//! Requests and replies are plain `Copy` views. All memory behind them is
//! owned by the worker's [`Arena`](crate::arena::Arena), which is why both carry
//! the arena lifetime `'a`.

mod method;
pub use method::Method;

mod content_type;
pub use content_type::ContentType;

mod request;
pub use request::Request;

mod response;
pub use response::Reply;

mod error;
pub use error::AllocError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::PathError;
pub use error::SendError;
