use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::codec::header::HeaderEncoder;
use crate::protocol::{Method, Reply, SendError};

/// Serializes a [`Reply`] as the answer to a request made with the given
/// [`Method`].
///
/// `HEAD` requests get the same head as `GET`, `Content-Length` included,
/// but no body.
#[derive(Debug, Default)]
pub struct ResponseEncoder {
    header_encoder: HeaderEncoder,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Encoder<(Reply<'_>, Method)> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (Reply<'_>, Method), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (reply, method) = item;
        self.header_encoder.encode(&reply, dst)?;

        if !method.is_head() {
            dst.put_slice(reply.body());
        }
        Ok(())
    }
}
