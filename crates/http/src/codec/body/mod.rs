//! Request body decoding.
//!
//! Bodies are only ever framed by `Content-Length`; chunked transfer coding
//! is not supported.

mod length_decoder;

pub use length_decoder::LengthDecoder;
