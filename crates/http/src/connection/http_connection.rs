use std::io;
use std::io::{ErrorKind, Read, Write};

use bytes::BytesMut;
use http::StatusCode;
use tokio_util::codec::Decoder;
use tracing::{error, info, warn};

use crate::arena::Arena;
use crate::codec::RequestDecoder;
use crate::connection::MessageWriter;
use crate::handler::Handler;
use crate::protocol::{AllocError, HttpError, Method, ParseError, Reply, SendError};

/// Default size of the read window, which also bounds a single request.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Memory owned by one worker thread and reused for every connection it serves.
#[derive(Debug)]
pub struct WorkerContext {
    arena: Arena,
    read_buf: BytesMut,
    write_buf: BytesMut,
    buffer_size: usize,
}

impl WorkerContext {
    pub fn new(buffer_size: usize) -> Result<Self, AllocError> {
        Ok(Self {
            arena: Arena::new()?,
            read_buf: BytesMut::with_capacity(buffer_size),
            write_buf: BytesMut::with_capacity(buffer_size),
            buffer_size,
        })
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }
}

/// An HTTP/1.1 connection processed to completion on the calling thread.
///
/// Requests are answered strictly in order. Bytes of a pipelined request that
/// arrive together with the previous one are kept in the read buffer and
/// decoded on the next cycle.
///
/// # Type Parameters
///
/// * `R`: the readable half of the stream
/// * `W`: the writable half of the stream
#[derive(Debug)]
pub struct HttpConnection<'c, R, W> {
    reader: R,
    writer: MessageWriter<'c, W>,
    read_buf: &'c mut BytesMut,
    arena: &'c mut Arena,
    buffer_size: usize,
}

impl<'c, R, W> HttpConnection<'c, R, W>
where
    R: Read,
    W: Write,
{
    pub fn new(reader: R, writer: W, context: &'c mut WorkerContext) -> Self {
        let WorkerContext { arena, read_buf, write_buf, buffer_size } = context;
        read_buf.clear();
        arena.clear();

        Self { reader, writer: MessageWriter::new(writer, write_buf), read_buf, arena, buffer_size: *buffer_size }
    }

    /// Serves requests until the peer closes the stream.
    ///
    /// A clean end of stream between requests is `Ok`. Transport errors, an
    /// end of stream in the middle of a request, and requests that can never
    /// fit in the read buffer end the connection with an error; the latter is
    /// answered with `400 Bad Request` first.
    pub fn process<H>(mut self, handler: &H) -> Result<(), HttpError>
    where
        H: Handler + ?Sized,
    {
        loop {
            let served = self.process_one(handler);
            self.arena.clear();
            if !served? {
                return Ok(());
            }
        }
    }

    /// Reads, handles and answers one request; `false` means end of stream.
    fn process_one<H>(&mut self, handler: &H) -> Result<bool, HttpError>
    where
        H: Handler + ?Sized,
    {
        let arena: &Arena = self.arena;
        let mut decoder = RequestDecoder::new(arena, self.buffer_size);

        let mut request = loop {
            match decoder.decode(self.read_buf) {
                Ok(Some(request)) => break request,
                Ok(None) => {}
                Err(e) => {
                    self.reject(&e);
                    return Err(e.into());
                }
            }

            let read = fill_buf(&mut self.reader, self.read_buf, self.buffer_size).map_err(ParseError::io)?;
            if read == 0 {
                if self.read_buf.is_empty() && !decoder.is_pending() {
                    return Ok(false);
                }
                return Err(ParseError::io(ErrorKind::UnexpectedEof).into());
            }
        };

        let reply = handler.call(&mut request, arena);
        info!(method = %request.method(), path = request.path(), status = reply.status().as_u16(), "handled request");

        self.writer.write(reply, request.method())?;
        self.writer.flush()?;
        Ok(true)
    }

    /// Best-effort error reply for a request that cannot be decoded.
    fn reject(&mut self, e: &ParseError) {
        error!(cause = %e, "can't receive next request");
        if !e.is_answerable() {
            return;
        }

        let status = match e {
            ParseError::Alloc { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        if let Err(send_error) = self.send_error(status) {
            warn!(cause = %send_error, "failed to send error reply");
        }
    }

    fn send_error(&mut self, status: StatusCode) -> Result<(), SendError> {
        self.writer.write(Reply::new(status), Method::Unknown)?;
        self.writer.flush()
    }
}

/// Reads once into the free part of the window, returning the byte count.
fn fill_buf<R: Read>(reader: &mut R, buf: &mut BytesMut, capacity: usize) -> io::Result<usize> {
    let filled = buf.len();
    let window = capacity.saturating_sub(filled).max(1);
    buf.resize(filled + window, 0);

    let read = loop {
        match reader.read(&mut buf[filled..]) {
            Ok(read) => break read,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                buf.truncate(filled);
                return Err(e);
            }
        }
    };

    buf.truncate(filled + read);
    Ok(read)
}
