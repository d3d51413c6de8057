//! HTTP connection handling module
//!
//! A worker thread serves one connection at a time with [`HttpConnection`],
//! reusing the memory in its [`WorkerContext`] across connections.
//!
//! # Lifecycle
//!
//! - read until a complete request is buffered, however fragmented
//! - hand it to the [`Handler`](crate::handler::Handler) and write the reply
//! - rewind the arena and continue with any pipelined bytes left over
//! - stop on end of stream or on the first unrecoverable error

mod http_connection;
mod message_writer;

pub use http_connection::{DEFAULT_BUFFER_SIZE, HttpConnection, WorkerContext};
pub use message_writer::MessageWriter;
