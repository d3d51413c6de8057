//! Request header decoder.
//!
//! Waits until the buffered bytes contain the blank line ending the header
//! block, moves the block into the request arena and tokenizes it in place.
//! Only the request line and three headers are interpreted:
//!
//! - `Accept-Encoding`: whether `gzip` is among the listed codings
//! - `Content-Length`: size of the body that follows the block
//! - `User-Agent`: echoed by the `/user-agent` route
//!
//! Header names are matched case-insensitively as prefixes of the line, after
//! any leading whitespace; the value starts after the colon and the whitespace
//! that follows it.

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::{debug, trace};

use crate::arena::Arena;
use crate::ensure;
use crate::protocol::{Method, ParseError, Request};

const CRLF: &[u8] = b"\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";

/// Decoder for the header block of one request.
///
/// Yields a [`Request`] whose slices borrow `arena`. The matched block is
/// removed from the source buffer; bytes after it stay in place.
#[derive(Debug)]
pub struct HeaderDecoder<'a> {
    arena: &'a Arena,
    max_size: usize,
    /// Prefix of the buffer already known not to contain the terminator.
    scanned: usize,
}

impl<'a> HeaderDecoder<'a> {
    pub fn new(arena: &'a Arena, max_size: usize) -> Self {
        Self { arena, max_size, scanned: 0 }
    }
}

impl<'a> Decoder for HeaderDecoder<'a> {
    type Item = Request<'a>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let start = self.scanned.saturating_sub(HEADER_END.len() - 1);
        let Some(pos) = src[start..].windows(HEADER_END.len()).position(|window| window == HEADER_END) else {
            ensure!(src.len() < self.max_size, ParseError::too_large_request(src.len(), self.max_size));
            self.scanned = src.len();
            return Ok(None);
        };

        let headers_len = start + pos + HEADER_END.len();
        self.scanned = 0;

        let block = src.split_to(headers_len);
        let raw: &'a [u8] = self.arena.alloc_slice_copy(&block)?;
        let request = parse_headers(raw);

        trace!(method = %request.method(), path = request.path(), headers_len, "decoded request header");
        Ok(Some(request))
    }
}

/// Returns the bytes from `offset` up to the next CRLF, or `None` when no
/// complete line is buffered yet.
pub fn find_next_line(buf: &[u8], offset: usize) -> Option<&[u8]> {
    let rest = buf.get(offset..)?;
    let end = rest.windows(CRLF.len()).position(|window| window == CRLF)?;
    Some(&rest[..end])
}

/// Tokenizes a complete header block, blank line included.
///
/// A request line without two space-separated tokens leaves the method
/// [`Unknown`](Method::Unknown) and the path empty.
pub fn parse_headers(raw: &[u8]) -> Request<'_> {
    let mut request = Request::new(raw);

    let Some(request_line) = find_next_line(raw, 0) else {
        return request;
    };
    parse_request_line(&mut request, request_line);

    let mut offset = request_line.len() + CRLF.len();
    while let Some(line) = find_next_line(raw, offset) {
        offset += line.len() + CRLF.len();
        if line.is_empty() {
            break;
        }
        parse_header_line(&mut request, line);
    }

    request.set_headers_len(offset);
    request
}

fn parse_request_line<'a>(request: &mut Request<'a>, line: &'a [u8]) {
    let Some(method_end) = line.iter().position(|b| *b == b' ') else {
        return;
    };
    let rest = &line[method_end..];
    let rest = &rest[rest.iter().take_while(|b| **b == b' ').count()..];

    let Some(path_end) = rest.iter().position(|b| *b == b' ') else {
        return;
    };

    request.set_method(Method::from_bytes(&line[..method_end]));
    // a target that is not UTF-8 stays empty and is rejected by canonicalization
    match std::str::from_utf8(&rest[..path_end]) {
        Ok(path) => request.set_path(path),
        Err(e) => debug!(request_target = %rest[..path_end].escape_ascii(), cause = %e, "request target is not utf-8"),
    }
}

/// Headers the decoder acts on.
#[derive(Debug, Clone, Copy)]
enum KnownHeader {
    AcceptEncoding,
    ContentLength,
    UserAgent,
}

const KNOWN_HEADERS: [(KnownHeader, &[u8]); 3] = [
    (KnownHeader::AcceptEncoding, b"Accept-Encoding"),
    (KnownHeader::ContentLength, b"Content-Length"),
    (KnownHeader::UserAgent, b"User-Agent"),
];

fn parse_header_line<'a>(request: &mut Request<'a>, line: &'a [u8]) {
    let Some((header, value)) =
        KNOWN_HEADERS.iter().find_map(|(header, name)| strip_header_name(line, name).map(|value| (*header, value)))
    else {
        return;
    };

    match header {
        KnownHeader::AcceptEncoding => {
            if accepts_gzip(value) {
                request.enable_gzip();
            }
        }
        KnownHeader::ContentLength => match parse_content_length(value) {
            Some(length) => request.set_content_length(length),
            None => debug!(value = %value.escape_ascii(), "ignoring malformed content-length"),
        },
        KnownHeader::UserAgent => request.set_user_agent(value),
    }
}

/// Matches `name` at the start of `line` and returns what follows the colon.
fn strip_header_name<'a>(line: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    let line = line.trim_ascii_start();
    let prefix = line.get(..name.len())?;
    if !prefix.eq_ignore_ascii_case(name) {
        return None;
    }

    let value = &line[name.len()..];
    let skip = value.iter().take_while(|b| **b == b':' || b.is_ascii_whitespace()).count();
    Some(&value[skip..])
}

fn accepts_gzip(value: &[u8]) -> bool {
    value.split(|b| *b == b',').any(|coding| {
        let coding = coding.split(|b| *b == b';').next().unwrap_or_default();
        coding.trim_ascii() == b"gzip"
    })
}

/// Leading decimal digits of `value`, or `None` when there are none or they overflow.
fn parse_content_length(value: &[u8]) -> Option<u64> {
    let digits = value.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    value[..digits].iter().try_fold(0_u64, |acc, digit| acc.checked_mul(10)?.checked_add(u64::from(digit - b'0')))
}
