//! Response head serialization.
//!
//! Writes the status line and the framing headers for a [`Reply`]. Which
//! headers appear depends on the status: a `400` carries none besides its
//! length, a `405` names the allowed methods, a `301` carries its
//! `Location`, and any other reply with a body describes that body.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use http::StatusCode;
use tokio_util::codec::Encoder;

use crate::protocol::{Reply, SendError};

/// Initial buffer size reserved for a serialized head.
const INIT_HEADER_SIZE: usize = 256;

/// Encoder for the head of a response implementing the [`Encoder`] trait.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderEncoder;

impl Encoder<&Reply<'_>> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, reply: &Reply<'_>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let status = reply.status();
        dst.reserve(INIT_HEADER_SIZE);

        write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", status.as_str(), status.canonical_reason().unwrap_or_default())?;

        match status {
            StatusCode::BAD_REQUEST => {}
            StatusCode::METHOD_NOT_ALLOWED => dst.put_slice(b"Allow: GET, HEAD\r\n"),
            StatusCode::MOVED_PERMANENTLY => {
                dst.put_slice(b"Location: ");
                dst.put_slice(reply.location().unwrap_or("/").as_bytes());
                dst.put_slice(b"\r\n");
            }
            _ if !reply.body().is_empty() => {
                dst.put_slice(b"Content-Type: ");
                dst.put_slice(reply.content_type().as_str().as_bytes());
                dst.put_slice(b"\r\n");
                if reply.is_gzip() {
                    dst.put_slice(b"Content-Encoding: gzip\r\n");
                }
            }
            _ => {}
        }

        if has_content_length(status) {
            write!(FastWrite(dst), "Content-Length: {}\r\n", reply.body().len())?;
        }

        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Informational replies and `204`/`304` never frame a body.
fn has_content_length(status: StatusCode) -> bool {
    !status.is_informational() && status != StatusCode::NO_CONTENT && status != StatusCode::NOT_MODIFIED
}

/// [`io::Write`] adapter appending to a [`BytesMut`].
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
