//! Input resolution: turn a user-supplied path or an uploaded byte buffer into
//! a local PDF file pdfium can open.
//!
//! pdfium needs a file-system path, so byte input is spooled to a
//! [`NamedTempFile`] that lives as long as the [`ResolvedInput`]. The `%PDF`
//! magic bytes are checked up front so callers get a meaningful error rather
//! than an opaque pdfium failure.

use crate::error::Pdf2TilesError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The resolved input: a local path or a spooled temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input arrived as bytes; the temp file is removed on drop.
    Spooled(NamedTempFile),
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Spooled(tmp) => tmp.path(),
        }
    }
}

/// Resolve a local file path, validating existence, readability and PDF magic bytes.
pub fn resolve_local(path: impl AsRef<Path>) -> Result<ResolvedInput, Pdf2TilesError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(Pdf2TilesError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != PDF_MAGIC {
                return Err(Pdf2TilesError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2TilesError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Pdf2TilesError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Spool in-memory PDF bytes to a temp file.
pub fn resolve_bytes(bytes: &[u8]) -> Result<ResolvedInput, Pdf2TilesError> {
    let mut tmp = NamedTempFile::new()
        .map_err(|e| Pdf2TilesError::Internal(format!("tempfile: {e}")))?;

    if bytes.len() >= 4 && &bytes[..4] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(Pdf2TilesError::NotAPdf {
            path: tmp.path().to_path_buf(),
            magic,
        });
    }

    tmp.write_all(bytes)
        .map_err(|e| Pdf2TilesError::Internal(format!("tempfile write: {e}")))?;
    tmp.flush()
        .map_err(|e| Pdf2TilesError::Internal(format!("tempfile flush: {e}")))?;

    debug!("Spooled {} bytes to {}", bytes.len(), tmp.path().display());
    Ok(ResolvedInput::Spooled(tmp))
}
