//! A blocking HTTP/1.1 connection engine built for a thread-per-worker server.
//!
//! This crate holds everything between an accepted TCP stream and a
//! [`Handler`](handler::Handler): a streaming request parser that copes with
//! fragmented reads and pipelining, response serialization, a per-worker
//! bump [`Arena`](arena::Arena) that backs all request-scoped memory, the
//! bounded [`WorkQueue`](queue::WorkQueue) feeding the workers, and a path
//! canonicalizer guarding against directory traversal. No external HTTP
//! parsing library is involved.
//!
//! # Example
//!
//! ```no_run
//! use std::net::TcpListener;
//! use strand_http::arena::Arena;
//! use strand_http::connection::{DEFAULT_BUFFER_SIZE, HttpConnection, WorkerContext};
//! use strand_http::handler::make_handler;
//! use strand_http::protocol::{ContentType, Reply, Request};
//! use tracing::{error, warn};
//!
//! fn hello_world<'a>(_request: &mut Request<'a>, _arena: &'a Arena) -> Reply<'a> {
//!     Reply::ok(ContentType::TextPlain, b"Hello World!\r\n")
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let listener = TcpListener::bind("127.0.0.1:8080")?;
//!     let handler = make_handler(hello_world);
//!     let mut context = WorkerContext::new(DEFAULT_BUFFER_SIZE)?;
//!
//!     for stream in listener.incoming() {
//!         let stream = match stream {
//!             Ok(stream) => stream,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let writer = stream.try_clone()?;
//!         if let Err(e) = HttpConnection::new(&stream, writer, &mut context).process(&handler) {
//!             error!(cause = %e, "connection shutdown");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`arena`]: request-scoped bump allocation, rewound after every request
//! - [`queue`]: blocking bounded FIFO between the accept loop and workers
//! - [`path`]: `.` and `..` resolution with rejection of escapes
//! - [`protocol`]: request, reply, method, media type and error types
//! - [`codec`]: request decoding and response encoding
//! - [`handler`]: the application seam
//! - [`connection`]: the per-connection read, handle, write loop
//!
//! # Limitations
//!
//! - HTTP/1.1 only, no TLS
//! - bodies framed by `Content-Length` only; no chunked transfer coding
//! - a request, headers and body together, must fit the read buffer
//! - no read or write timeouts
//!
//! # Safety
//!
//! Unsafe code is confined to the [`arena`], where raw allocations are
//! turned into borrowed slices, and to one UTF-8 reassembly in [`path`].

pub mod arena;
pub mod codec;
pub mod connection;
pub mod handler;
pub mod path;
pub mod protocol;
pub mod queue;

mod utils;
pub(crate) use utils::ensure;
