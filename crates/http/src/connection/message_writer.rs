use std::io::Write;

use bytes::BytesMut;
use tokio_util::codec::Encoder;

use crate::codec::ResponseEncoder;
use crate::protocol::{Method, Reply, SendError};

/// Buffers encoded replies and pushes them to the underlying writer.
#[derive(Debug)]
pub struct MessageWriter<'c, W> {
    writer: W,
    buffer: &'c mut BytesMut,
    encoder: ResponseEncoder,
}

impl<'c, W> MessageWriter<'c, W>
where
    W: Write,
{
    pub fn new(writer: W, buffer: &'c mut BytesMut) -> Self {
        buffer.clear();
        Self { writer, buffer, encoder: ResponseEncoder::new() }
    }

    #[inline]
    pub fn write(&mut self, reply: Reply<'_>, method: Method) -> Result<(), SendError> {
        self.encoder.encode((reply, method), self.buffer)
    }

    /// Writes out everything buffered, looping over partial writes.
    pub fn flush(&mut self) -> Result<(), SendError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let result = self.writer.write_all(self.buffer.as_ref()).and_then(|()| self.writer.flush());
        self.buffer.clear();
        Ok(result?)
    }
}
