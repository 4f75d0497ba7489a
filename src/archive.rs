//! Access to the files of a finished conversion: one ZIP with every tile,
//! or a single tile for preview/download.
//!
//! Tiles live under `<output_root>/<conversion_id>/`. Both ids and file
//! names arrive from callers (CLI arguments, HTTP paths), so each is checked
//! to be a single plain path component before it touches the file system.

use crate::error::Pdf2TilesError;
use crate::history::HistoryStore;
use std::io::{Cursor, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Download name for a conversion's archive.
///
/// `report.pdf` → `report_tiles.zip`; without a known source name,
/// `conversion_{id}.zip`.
pub fn archive_name(original_filename: Option<&str>, id: &str) -> String {
    match original_filename
        .map(Path::new)
        .and_then(Path::file_stem)
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
    {
        Some(stem) => format!("{stem}_tiles.zip"),
        None => format!("conversion_{id}.zip"),
    }
}

/// `true` if `name` is exactly one normal path component.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

/// Directory holding the tiles of conversion `id`.
pub fn conversion_dir(output_root: &Path, id: &str) -> Result<PathBuf, Pdf2TilesError> {
    if !is_plain_name(id) {
        return Err(Pdf2TilesError::ConversionNotFound { id: id.to_string() });
    }
    let dir = output_root.join(id);
    if !dir.is_dir() {
        return Err(Pdf2TilesError::ConversionNotFound { id: id.to_string() });
    }
    Ok(dir)
}

/// Path of one tile of conversion `id`.
pub fn tile_path(output_root: &Path, id: &str, filename: &str) -> Result<PathBuf, Pdf2TilesError> {
    let not_found = || Pdf2TilesError::TileNotFound {
        id: id.to_string(),
        filename: filename.to_string(),
    };
    if !is_plain_name(filename) {
        return Err(not_found());
    }
    let dir = conversion_dir(output_root, id).map_err(|_| not_found())?;
    let path = dir.join(filename);
    if !path.is_file() {
        return Err(not_found());
    }
    Ok(path)
}

/// Zip every regular file of the conversion directory, sorted by name.
pub fn write_zip<W>(dir: &Path, writer: W) -> Result<W, Pdf2TilesError>
where
    W: Write + std::io::Seek,
{
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| Pdf2TilesError::ArchiveFailed(format!("read {}: {e}", dir.display())))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(writer);
    for path in &entries {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let bytes = std::fs::read(path)
            .map_err(|e| Pdf2TilesError::ArchiveFailed(format!("read {}: {e}", path.display())))?;
        zip.start_file(name, options)
            .map_err(|e| Pdf2TilesError::ArchiveFailed(e.to_string()))?;
        zip.write_all(&bytes)
            .map_err(|e| Pdf2TilesError::ArchiveFailed(e.to_string()))?;
    }
    debug!("Zipped {} files from {}", entries.len(), dir.display());
    zip.finish()
        .map_err(|e| Pdf2TilesError::ArchiveFailed(e.to_string()))
}

/// An in-memory archive ready to be served or saved.
#[derive(Debug, Clone)]
pub struct Archive {
    /// Suggested download name.
    pub name: String,
    /// ZIP bytes.
    pub bytes: Vec<u8>,
}

/// Package all tiles of conversion `id` into an in-memory ZIP.
///
/// The archive name comes from the history record when `store` knows the
/// conversion.
pub fn package_conversion(
    output_root: &Path,
    id: &str,
    store: Option<&dyn HistoryStore>,
) -> Result<Archive, Pdf2TilesError> {
    let dir = conversion_dir(output_root, id)?;
    let original = match store {
        Some(store) => store.get(id)?.map(|r| r.original_filename),
        None => None,
    };
    let name = archive_name(original.as_deref(), id);

    let bytes = write_zip(&dir, Cursor::new(Vec::new()))?.into_inner();
    info!("Packaged conversion {} → {} ({} bytes)", id, name, bytes.len());
    Ok(Archive { name, bytes })
}
