//! Store files
//!
//! Reads and writes the two files backing a store. Both files are handled
//! on separate scoped threads; a save replaces each file atomically via a
//! temp file + rename, but the pair is not replaced atomically.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crossbeam::thread::ScopedJoinHandle;
use tracing::warn;

use crate::error::{Result, ShelfError};
use crate::record::Record;

use super::RecordIndex;

/// Contents of a store directory as read from disk
#[derive(Debug, Default)]
pub(crate) struct LoadedFiles {
    pub records: Vec<Record>,

    /// `None` when the index file was unreadable as JSON
    pub index: Option<RecordIndex>,
}

/// Paths and I/O for one store directory
#[derive(Debug, Clone)]
pub(crate) struct StoreFiles {
    dir: PathBuf,
}

impl StoreFiles {
    // =========================================================================
    // File Name Constants
    // =========================================================================
    pub const ROWS_FILENAME: &'static str = "rows";
    pub const INDEX_FILENAME: &'static str = "index";
    const TEMP_SUFFIX: &'static str = "tmp";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn rows_path(&self) -> PathBuf {
        self.dir.join(Self::ROWS_FILENAME)
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(Self::INDEX_FILENAME)
    }

    // =========================================================================
    // Read Path
    // =========================================================================

    /// Read rows and index concurrently
    ///
    /// A missing file reads as empty. Corrupt rows are an error; a corrupt
    /// index yields `index: None` so the caller can rebuild it.
    pub fn read(&self) -> Result<LoadedFiles> {
        self.remove_stale_temp_files();

        let rows_path = self.rows_path();
        let index_path = self.index_path();

        let (records, index) = crossbeam::thread::scope(|s| {
            let rows = s.spawn(|_| read_rows(&rows_path));
            let index = s.spawn(|_| read_index(&index_path));
            (join(rows, "rows reader"), join(index, "index reader"))
        })
        .map_err(|_| ShelfError::WorkerPanicked("store reader".to_string()))?;

        let records = records?;
        let index = match index {
            Ok(index) => Some(index),
            Err(ShelfError::Corrupt { path, message, .. }) => {
                warn!(path = %path.display(), %message, "Index file is corrupt");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(LoadedFiles { records, index })
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    /// Rewrite both files in full
    ///
    /// Creates the store directory (and parents) first. The two payloads
    /// are serialized up front, then written concurrently.
    pub fn write(&self, records: &[Record], index: &RecordIndex, sync: bool) -> Result<()> {
        let rows_payload = encode_rows(records)?;
        let index_payload = serde_json::to_string(&index.to_sorted())
            .map_err(|e| ShelfError::Serialization(e.to_string()))?;

        fs::create_dir_all(&self.dir).map_err(|e| ShelfError::file_io(&self.dir, e))?;

        let rows_path = self.rows_path();
        let index_path = self.index_path();

        let (rows_result, index_result) = crossbeam::thread::scope(|s| {
            let rows = s.spawn(|_| replace_file(&rows_path, rows_payload.as_bytes(), sync));
            let index = s.spawn(|_| replace_file(&index_path, index_payload.as_bytes(), sync));
            (join(rows, "rows writer"), join(index, "index writer"))
        })
        .map_err(|_| ShelfError::WorkerPanicked("store writer".to_string()))?;

        rows_result?;
        index_result
    }

    /// Delete `*.tmp` leftovers from an interrupted save
    fn remove_stale_temp_files(&self) {
        for name in [Self::ROWS_FILENAME, Self::INDEX_FILENAME] {
            let temp = temp_path(&self.dir.join(name));
            match fs::remove_file(&temp) {
                Ok(()) => warn!(path = %temp.display(), "Removed stale temp file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %temp.display(), error = %e, "Could not remove stale temp file"),
            }
        }
    }
}

// =============================================================================
// Encoding / Decoding
// =============================================================================

/// One JSON object per line, each line terminated by `\n`
pub(crate) fn encode_rows(records: &[Record]) -> Result<String> {
    let mut buffer = String::new();
    for record in records {
        let line =
            serde_json::to_string(record).map_err(|e| ShelfError::Serialization(e.to_string()))?;
        buffer.push_str(&line);
        buffer.push('\n');
    }
    Ok(buffer)
}

/// Parse a rows file; blank lines are skipped
pub(crate) fn decode_rows(path: &Path, contents: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (n, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(trimmed)
            .map_err(|e| ShelfError::corrupt_line(path, n + 1, e.to_string()))?;
        records.push(record);
    }
    Ok(records)
}

/// Parse an index file; an empty (or whitespace-only) file is an empty index
pub(crate) fn decode_index(path: &Path, contents: &str) -> Result<RecordIndex> {
    if contents.trim().is_empty() {
        return Ok(RecordIndex::new());
    }
    let positions: HashMap<String, usize> =
        serde_json::from_str(contents).map_err(|e| ShelfError::corrupt(path, e.to_string()))?;
    Ok(RecordIndex::from(positions))
}

// =============================================================================
// Private Helpers
// =============================================================================

fn read_rows(path: &Path) -> Result<Vec<Record>> {
    match read_optional(path)? {
        Some(contents) => decode_rows(path, &contents),
        None => Ok(Vec::new()),
    }
}

fn read_index(path: &Path) -> Result<RecordIndex> {
    match read_optional(path)? {
        Some(contents) => decode_index(path, &contents),
        None => Ok(RecordIndex::new()),
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            Err(ShelfError::corrupt(path, "file is not valid UTF-8"))
        }
        Err(e) => Err(ShelfError::file_io(path, e)),
    }
}

/// Write to `<path>.tmp`, optionally fsync, then rename over `path`
fn replace_file(path: &Path, contents: &[u8], sync: bool) -> Result<()> {
    let temp = temp_path(path);

    let mut file = File::create(&temp).map_err(|e| ShelfError::file_io(&temp, e))?;
    file.write_all(contents)
        .map_err(|e| ShelfError::file_io(&temp, e))?;
    if sync {
        file.sync_all().map_err(|e| ShelfError::file_io(&temp, e))?;
    }
    drop(file);

    fs::rename(&temp, path).map_err(|e| ShelfError::file_io(path, e))
}

fn temp_path(path: &Path) -> PathBuf {
    path.with_extension(StoreFiles::TEMP_SUFFIX)
}

fn join<T>(handle: ScopedJoinHandle<'_, Result<T>>, worker: &str) -> Result<T> {
    handle
        .join()
        .map_err(|_| ShelfError::WorkerPanicked(worker.to_string()))?
}
