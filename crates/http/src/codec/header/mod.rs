//! Header block processing for requests and responses.
//!
//! - [`HeaderDecoder`] finds the end of a request's header block and
//!   tokenizes it with [`parse_headers`]
//! - [`HeaderEncoder`] writes the status line and framing headers of a reply

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_decoder::find_next_line;
pub use header_decoder::parse_headers;
pub use header_encoder::HeaderEncoder;
