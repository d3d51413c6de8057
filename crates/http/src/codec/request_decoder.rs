//! HTTP request decoder module
//!
//! Decoding runs in two phases over the connection buffer:
//!
//! 1. [`HeaderDecoder`] waits for the complete header block
//! 2. [`LengthDecoder`] waits for `Content-Length` body bytes, when announced
//!
//! Exactly one request is consumed from the buffer; bytes of a pipelined
//! follow-up request stay at its front.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::arena::Arena;
use crate::codec::body::LengthDecoder;
use crate::codec::header::HeaderDecoder;
use crate::ensure;
use crate::protocol::{ParseError, Request};

/// A decoder for one HTTP request, header block and body.
///
/// The decoder is bound to the arena of the request it produces, so a new
/// one is created for every request on a connection.
///
/// # State Machine
///
/// - `pending == None`: parsing headers
/// - `pending == Some(_)`: headers parsed, waiting for the body
#[derive(Debug)]
pub struct RequestDecoder<'a> {
    arena: &'a Arena,
    max_size: usize,
    header_decoder: HeaderDecoder<'a>,
    pending: Option<(Request<'a>, LengthDecoder)>,
}

impl<'a> RequestDecoder<'a> {
    /// Creates a decoder for requests of at most `max_size` bytes, headers
    /// and body together.
    pub fn new(arena: &'a Arena, max_size: usize) -> Self {
        Self { arena, max_size, header_decoder: HeaderDecoder::new(arena, max_size), pending: None }
    }

    /// Whether the header block was consumed and the body is still incomplete.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl<'a> Decoder for RequestDecoder<'a> {
    type Item = Request<'a>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let (mut request, mut body_decoder) = match self.pending.take() {
            Some(pending) => pending,
            None => {
                let Some(request) = self.header_decoder.decode(src)? else {
                    return Ok(None);
                };
                if request.content_length() == 0 {
                    return Ok(Some(request));
                }

                let total = (request.headers_len() as u64).saturating_add(request.content_length());
                ensure!(
                    total <= self.max_size as u64,
                    ParseError::too_large_request(usize::try_from(total).unwrap_or(usize::MAX), self.max_size)
                );

                // bounded by max_size above
                (request, LengthDecoder::new(request.content_length() as usize))
            }
        };

        match body_decoder.decode(src)? {
            Some(body) => {
                request.set_body(self.arena.alloc_slice_copy(&body)?);
                Ok(Some(request))
            }
            None => {
                self.pending = Some((request, body_decoder));
                Ok(None)
            }
        }
    }
}
