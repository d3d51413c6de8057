//! Request path canonicalization.
//!
//! The router resolves paths against a directory on disk, so every path is
//! normalized first: `.` segments and empty segments vanish, `..` removes the
//! previous segment, and a `..` that would climb above the root rejects the
//! whole path.

use crate::arena::Arena;
use crate::ensure;
use crate::protocol::PathError;

/// Resolves `.` and `..` segments in `path`.
///
/// Paths containing neither are returned unchanged, without touching the
/// arena. Otherwise the canonical form is rebuilt in `arena`, keeping a
/// trailing `/` when the input had one and some segment survived.
///
/// ```
/// use strand_http::arena::Arena;
/// use strand_http::path::canonicalize;
///
/// let arena = Arena::new().unwrap();
/// assert_eq!(canonicalize("/a/./b/", &arena).unwrap(), "/a/b/");
/// assert_eq!(canonicalize("/a/b/../", &arena).unwrap(), "/a/");
/// assert!(canonicalize("/../etc/passwd", &arena).is_err());
/// ```
pub fn canonicalize<'a>(path: &'a str, arena: &'a Arena) -> Result<&'a str, PathError> {
    ensure!(path.starts_with('/'), PathError::Invalid);

    let capacity = path.bytes().filter(|b| *b == b'/').count() + 1;
    let stack = arena.alloc_slice_fill(capacity, "")?;
    let mut depth = 0;
    let mut rewritten = false;

    for segment in path.split('/') {
        match segment {
            "" => {}
            "." => rewritten = true,
            ".." => {
                rewritten = true;
                ensure!(depth > 0, PathError::Invalid);
                depth -= 1;
            }
            segment => {
                stack[depth] = segment;
                depth += 1;
            }
        }
    }

    if !rewritten {
        return Ok(path);
    }

    let segments = &stack[..depth];
    if segments.is_empty() {
        return Ok("/");
    }

    let len = segments.iter().map(|segment| segment.len() + 1).sum::<usize>() + usize::from(path.ends_with('/'));
    let buf = arena.alloc_bytes(len)?;
    let mut offset = 0;
    for segment in segments {
        buf[offset] = b'/';
        buf[offset + 1..offset + 1 + segment.len()].copy_from_slice(segment.as_bytes());
        offset += segment.len() + 1;
    }
    if path.ends_with('/') {
        buf[offset] = b'/';
    }

    // SAFETY: `buf` is made of `/` separators and whole segments of a `&str`, split only at `/`.
    Ok(unsafe { std::str::from_utf8_unchecked(buf) })
}
