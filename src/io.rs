//! File input for documents and page images.
//!
//! Large documents are memory-mapped; small ones are read directly.

use std::fs::File;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use memmap2::Mmap;

use crate::error::{Error, Result};

/// Files at or above this size are memory-mapped.
pub const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Maximum accepted document size (512 MiB).
pub const MAX_DOCUMENT_SIZE: u64 = 512 * 1024 * 1024;

/// Maximum accepted page image size (20 MiB).
pub const MAX_IMAGE_SIZE: u64 = 20 * 1024 * 1024;

fn too_large(path: &Path, size: u64, max: u64) -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!("{} is too large ({size} bytes, max {max})", path.display()),
    ))
}

/// Reads a page-delimited UTF-8 document.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read, exceeds
/// [`MAX_DOCUMENT_SIZE`], or is not valid UTF-8.
pub fn read_document(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    if size > MAX_DOCUMENT_SIZE {
        return Err(too_large(path, size, MAX_DOCUMENT_SIZE));
    }
    if size < MMAP_THRESHOLD {
        return Ok(std::fs::read_to_string(path)?);
    }

    // SAFETY: the mapping is read-only and dropped before returning; the
    // text is copied out after UTF-8 validation.
    #[allow(unsafe_code)]
    let mmap = unsafe { Mmap::map(&file)? };
    let text = std::str::from_utf8(&mmap).map_err(|e| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{} is not valid UTF-8: {e}", path.display()),
        ))
    })?;
    Ok(text.to_string())
}

/// Reads an image file and returns it base64-encoded, as page images are
/// passed to the agent.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read or exceeds
/// [`MAX_IMAGE_SIZE`].
pub fn read_image_base64(path: &Path) -> Result<String> {
    let size = std::fs::metadata(path)?.len();
    if size > MAX_IMAGE_SIZE {
        return Err(too_large(path, size, MAX_IMAGE_SIZE));
    }
    let bytes = std::fs::read(path)?;
    Ok(BASE64.encode(bytes))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_small_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap_or_else(|e| panic!("tempfile: {e}"));
        write!(file, "--- Page 1 ---\nhello").unwrap_or_else(|e| panic!("write: {e}"));
        let text = read_document(file.path()).unwrap_or_else(|e| panic!("read: {e}"));
        assert_eq!(text, "--- Page 1 ---\nhello");
    }

    #[test]
    fn test_read_mapped_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap_or_else(|e| panic!("tempfile: {e}"));
        let body = "é".repeat(usize::try_from(MMAP_THRESHOLD).unwrap_or(0));
        file.write_all(body.as_bytes())
            .unwrap_or_else(|e| panic!("write: {e}"));
        let text = read_document(file.path()).unwrap_or_else(|e| panic!("read: {e}"));
        assert_eq!(text.chars().count(), body.chars().count());
    }

    #[test]
    fn test_read_invalid_utf8_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap_or_else(|e| panic!("tempfile: {e}"));
        let mut bytes = vec![b'a'; usize::try_from(MMAP_THRESHOLD).unwrap_or(0)];
        bytes.push(0xFF);
        file.write_all(&bytes).unwrap_or_else(|e| panic!("write: {e}"));
        assert!(matches!(read_document(file.path()), Err(Error::Io(_))));
    }

    #[test]
    fn test_read_image_base64() {
        let mut file = tempfile::NamedTempFile::new().unwrap_or_else(|e| panic!("tempfile: {e}"));
        file.write_all(&[0xFF, 0xD8, 0xFF])
            .unwrap_or_else(|e| panic!("write: {e}"));
        let encoded = read_image_base64(file.path()).unwrap_or_else(|e| panic!("read: {e}"));
        assert_eq!(encoded, "/9j/");
    }

    #[test]
    fn test_missing_file() {
        assert!(read_document(Path::new("/nonexistent/doc.txt")).is_err());
    }
}
