//! Filesystem access for static file serving.
//!
//! The router only ever sees canonical request paths, so lookups simply join
//! them onto the serve root. Failures other than "not there" are reported as
//! an [`FsError`] whose detail ends up in the body of a `500` reply.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use strand_http::arena::Arena;
use strand_http::protocol::{AllocError, ContentType};
use thiserror::Error;

/// What a request path names on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Absent,
    File,
    Directory,
}

/// A filesystem failure with a human-readable detail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{detail}")]
pub struct FsError {
    detail: String,
}

impl FsError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self { detail: detail.into() }
    }

    /// Formats `e` as `<prefix>: [<os error code>] <message>`.
    pub fn io(prefix: &str, e: &io::Error) -> Self {
        match e.raw_os_error() {
            Some(code) => Self::new(format!("{prefix}: [{code}] {}", e.kind())),
            None => Self::new(format!("{prefix}: {e}")),
        }
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<AllocError> for FsError {
    fn from(e: AllocError) -> Self {
        Self::new(e.to_string())
    }
}

/// The filesystem collaborator of the router.
pub trait FileSystem {
    /// Classifies the entry at `path`; a missing entry is not an error.
    fn classify(&self, path: &str) -> Result<FileKind, FsError>;

    /// Reads the whole file at `path` into `arena`, `None` when it does not exist.
    fn read<'a>(&self, path: &str, arena: &'a Arena) -> Result<Option<&'a [u8]>, FsError>;
}

/// Serves files below a root directory.
#[derive(Debug, Clone)]
pub struct ServeDir {
    root: PathBuf,
}

impl ServeDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

fn is_absent(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}

impl FileSystem for ServeDir {
    fn classify(&self, path: &str) -> Result<FileKind, FsError> {
        let metadata = match fs::metadata(self.resolve(path)) {
            Ok(metadata) => metadata,
            Err(e) if is_absent(&e) => return Ok(FileKind::Absent),
            Err(e) => return Err(FsError::io("unexpected error while locating file", &e)),
        };

        if metadata.is_dir() {
            Ok(FileKind::Directory)
        } else if metadata.is_file() {
            Ok(FileKind::File)
        } else {
            Err(FsError::new("given path exists, but is neither file nor directory!"))
        }
    }

    fn read<'a>(&self, path: &str, arena: &'a Arena) -> Result<Option<&'a [u8]>, FsError> {
        let mut file = match File::open(self.resolve(path)) {
            Ok(file) => file,
            Err(e) if is_absent(&e) => return Ok(None),
            Err(e) => return Err(FsError::io("file exists, but failed to open", &e)),
        };

        let metadata = file.metadata().map_err(|e| FsError::io("failure to read file", &e))?;
        if metadata.is_dir() {
            return Err(FsError::new("failure to read file: is a directory"));
        }
        let len = metadata.len();
        let len = usize::try_from(len).map_err(|_e| FsError::new(format!("file of {len} bytes does not fit in memory")))?;

        let content = arena.alloc_bytes(len)?;
        file.read_exact(content).map_err(|e| FsError::io("failure to read file", &e))?;
        Ok(Some(content))
    }
}

static CONTENT_TYPES: Lazy<HashMap<&'static str, ContentType>> = Lazy::new(|| {
    HashMap::from([
        ("html", ContentType::TextHtml),
        ("htm", ContentType::TextHtml),
        ("css", ContentType::TextCss),
        ("js", ContentType::TextJavascript),
        ("mjs", ContentType::TextJavascript),
        ("txt", ContentType::TextPlain),
        ("avif", ContentType::ImageAvif),
        ("bmp", ContentType::ImageBmp),
        ("gif", ContentType::ImageGif),
        ("jpg", ContentType::ImageJpeg),
        ("jpeg", ContentType::ImageJpeg),
        ("png", ContentType::ImagePng),
        ("ico", ContentType::ImageXIcon),
        ("webp", ContentType::ImageWebp),
    ])
});

/// Infers the content type of `path` from its extension.
pub fn content_type_for(path: &str) -> ContentType {
    Path::new(path)
        .extension()
        .and_then(|extension| extension.to_str())
        .and_then(|extension| CONTENT_TYPES.get(extension.to_ascii_lowercase().as_str()).copied())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn serve_dir() -> (TempDir, ServeDir) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/index.html"), "<h1>docs</h1>").unwrap();
        fs::write(dir.path().join("empty.txt"), "").unwrap();
        let serve_dir = ServeDir::new(dir.path());
        (dir, serve_dir)
    }

    #[test]
    fn classify_entries() {
        let (_dir, serve_dir) = serve_dir();
        assert_eq!(serve_dir.classify("/").unwrap(), FileKind::Directory);
        assert_eq!(serve_dir.classify("/docs").unwrap(), FileKind::Directory);
        assert_eq!(serve_dir.classify("/docs/").unwrap(), FileKind::Directory);
        assert_eq!(serve_dir.classify("/docs/index.html").unwrap(), FileKind::File);
        assert_eq!(serve_dir.classify("/missing.txt").unwrap(), FileKind::Absent);
        assert_eq!(serve_dir.classify("/empty.txt/below").unwrap(), FileKind::Absent);
    }

    #[test]
    fn read_into_arena() {
        let (_dir, serve_dir) = serve_dir();
        let arena = Arena::new().unwrap();

        assert_eq!(serve_dir.read("/docs/index.html", &arena).unwrap(), Some(&b"<h1>docs</h1>"[..]));
        assert_eq!(serve_dir.read("/empty.txt", &arena).unwrap(), Some(&b""[..]));
        assert_eq!(serve_dir.read("/missing.txt", &arena).unwrap(), None);
    }

    #[test]
    fn reading_a_directory_fails_with_detail() {
        let (_dir, serve_dir) = serve_dir();
        let arena = Arena::new().unwrap();

        let err = serve_dir.read("/docs", &arena).unwrap_err();
        assert_eq!(err.detail(), "failure to read file: is a directory");
    }

    #[test]
    fn io_detail_format() {
        let err = FsError::io("file exists, but failed to open", &io::Error::from_raw_os_error(13));
        assert_eq!(err.detail(), "file exists, but failed to open: [13] permission denied");

        let err = FsError::io("failure to read file", &io::Error::new(ErrorKind::UnexpectedEof, "short read"));
        assert_eq!(err.detail(), "failure to read file: short read");
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for("/index.html"), ContentType::TextHtml);
        assert_eq!(content_type_for("/style.CSS"), ContentType::TextCss);
        assert_eq!(content_type_for("/app.js"), ContentType::TextJavascript);
        assert_eq!(content_type_for("/logo.jpeg"), ContentType::ImageJpeg);
        assert_eq!(content_type_for("/favicon.ico"), ContentType::ImageXIcon);
        assert_eq!(content_type_for("/archive.tar.gz"), ContentType::ApplicationOctetStream);
        assert_eq!(content_type_for("/README"), ContentType::ApplicationOctetStream);
        assert_eq!(content_type_for("/.hidden"), ContentType::ApplicationOctetStream);
    }
}
