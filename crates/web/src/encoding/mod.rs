//! Content encoding of reply bodies.
//!
//! Only gzip is offered. Compression is all-or-nothing: a [`Compressor`]
//! either yields the complete encoded body or nothing, in which case the
//! identity body is sent.

use std::io;
use std::io::Write;

use bytes::{Bytes, BytesMut};
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::trace;

/// Buffer collecting the encoder's output.
// inspired by actix-http
pub(crate) struct Writer {
    buf: BytesMut,
}

impl Writer {
    fn with_capacity(capacity: usize) -> Self {
        Self { buf: BytesMut::with_capacity(capacity) }
    }

    fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The compression collaborator of the router.
pub trait Compressor {
    /// Encodes `input`, or `None` when the codec fails.
    fn compress(&self, input: &[u8]) -> Option<Bytes>;
}

/// Gzip through `flate2`.
#[derive(Debug, Clone, Copy)]
pub struct Gzip {
    level: Compression,
}

impl Gzip {
    pub fn new(level: Compression) -> Self {
        Self { level }
    }
}

impl Default for Gzip {
    fn default() -> Self {
        Self::new(Compression::default())
    }
}

impl Compressor for Gzip {
    fn compress(&self, input: &[u8]) -> Option<Bytes> {
        let mut encoder = GzEncoder::new(Writer::with_capacity(input.len()), self.level);
        match encoder.write_all(input).and_then(|()| encoder.finish()) {
            Ok(mut writer) => Some(writer.take()),
            Err(e) => {
                trace!(cause = %e, "gzip compression failed");
                None
            }
        }
    }
}
