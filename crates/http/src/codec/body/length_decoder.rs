//! Decoder for bodies framed by `Content-Length`, as defined in
//! [RFC 9112 Section 6.2](https://www.rfc-editor.org/rfc/rfc9112#section-6.2).

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::protocol::ParseError;

/// Yields the whole body at once, when all `length` bytes are buffered.
///
/// Handlers see a complete body or nothing, so no partial chunks are ever
/// produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    length: usize,
}

impl LengthDecoder {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Decoder for LengthDecoder {
    type Item = BytesMut;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < self.length {
            src.reserve(self.length - src.len());
            return Ok(None);
        }

        Ok(Some(src.split_to(self.length)))
    }
}
