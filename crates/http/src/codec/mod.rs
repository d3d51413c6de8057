//! HTTP codec module for decoding requests and encoding responses.
//!
//! Both directions implement the `tokio_util` codec traits over a
//! [`BytesMut`](bytes::BytesMut) buffer, driven synchronously by the
//! connection loop.
//!
//! # Architecture
//!
//! - Request handling:
//!   - [`RequestDecoder`]: decodes one request, header block then body
//!   - [`HeaderDecoder`] and [`parse_headers`]: header block tokenization
//!   - body accumulation via the `body` module
//!
//! - Response handling:
//!   - [`ResponseEncoder`]: head plus body, body omitted for `HEAD`
//!   - [`HeaderEncoder`]: status line and framing headers
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use strand_http::arena::Arena;
//! use strand_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//!
//! let arena = Arena::new().unwrap();
//! let mut buf = BytesMut::from(&b"GET /echo/hi HTTP/1.1\r\n\r\n"[..]);
//! let request = RequestDecoder::new(&arena, 4096).decode(&mut buf).unwrap().unwrap();
//! assert_eq!(request.path(), "/echo/hi");
//! ```

mod body;
mod header;
mod request_decoder;
mod response_encoder;

pub use header::{HeaderDecoder, HeaderEncoder, find_next_line, parse_headers};
pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
