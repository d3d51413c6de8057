//! The strand origin server.
//!
//! A fixed pool of worker threads serves connections handed over by a single
//! accept loop through a bounded [`WorkQueue`](strand_http::queue::WorkQueue).
//! Each worker owns an arena and a pair of buffers, reused across every
//! request it serves.
//!
//! # Example
//!
//! ```no_run
//! use strand_web::Server;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! Server::builder().address("127.0.0.1:8080").serve_root("public").workers(4).build()?.start()?;
//! # Ok(())
//! # }
//! ```

pub mod encoding;
pub mod fs;
pub mod router;
mod server;

pub use router::Router;
pub use server::{DEFAULT_PORT, DEFAULT_SERVE_ROOT, DEFAULT_WORKERS, Server, ServerBuildError, ServerBuilder};
