//! File-backed event log: one append-only JSONL file per stream.
//!
//! The layout follows this structure:
//! ```text
//! <base_dir>/
//!     streams/
//!         <stream>.jsonl      -- one record per line, in append order
//! ```
//!
//! Each line is `{"id": N, "fields": [["event", "..."]]}`. Line order is
//! record order; ids are assigned from a per-stream counter recovered by
//! scanning the file when the stream is first touched after open. A
//! corrupt line is skipped with a warning on read -- the idempotent fold
//! downstream tolerates the gap, and one bad record must not make the
//! whole stream unreadable.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::LogError;
use crate::log::{EventLog, RecordFields, RecordId};

/// Manages the on-disk directory layout for stream files.
///
/// `LogDir` is cheap to clone (it wraps a single `PathBuf`) and provides
/// path helpers plus stream listing.
#[derive(Debug, Clone)]
pub struct LogDir {
    base_dir: PathBuf,
}

impl LogDir {
    /// Create a new `LogDir` rooted at the given base directory.
    ///
    /// The directory does not need to exist yet; it is created lazily on
    /// the first append.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the root directory of this layout.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns the directory holding all stream files:
    /// `<base_dir>/streams`.
    pub fn streams_dir(&self) -> PathBuf {
        self.base_dir.join("streams")
    }

    /// Returns the file path for the named stream:
    /// `<base_dir>/streams/<stream>.jsonl`.
    pub fn stream_path(&self, stream: &str) -> PathBuf {
        self.streams_dir().join(format!("{stream}.jsonl"))
    }

    /// Lists all stream names that have a file on disk.
    ///
    /// # Errors
    ///
    /// Returns `std::io::Error` if reading the directory fails for a
    /// reason other than the directory not existing.
    pub fn list_streams(&self) -> std::io::Result<Vec<String>> {
        let entries = match fs::read_dir(self.streams_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                if path.extension()? != "jsonl" {
                    return None;
                }
                Some(path.file_stem()?.to_string_lossy().into_owned())
            })
            .collect();

        names.sort();
        Ok(names)
    }
}

/// On-disk shape of one record: a single line of JSON.
#[derive(Debug, Serialize, Deserialize)]
struct RecordLine {
    id: u64,
    fields: RecordFields,
}

/// Durable [`EventLog`] backend writing one JSONL file per stream.
///
/// Appends are serialized by a `tokio` mutex guarding the per-stream id
/// counters, so concurrent writers within a process observe the same
/// total order the file records. `Clone` is cheap; clones share the
/// counters and the directory.
#[derive(Debug, Clone)]
pub struct JsonlLog {
    dir: LogDir,
    /// Last assigned id per stream. Populated lazily from disk.
    counters: Arc<Mutex<HashMap<String, u64>>>,
}

impl JsonlLog {
    /// Open (or create on first append) a log rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: LogDir::new(base_dir),
            counters: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the directory layout in use.
    pub fn dir(&self) -> &LogDir {
        &self.dir
    }

    /// Recover the last assigned id for a stream by scanning its file.
    ///
    /// Returns 0 for a missing file. Corrupt lines are ignored here the
    /// same way reads ignore them, so a torn trailing write does not
    /// block recovery.
    fn last_id_on_disk(path: &Path) -> std::io::Result<u64> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut last = 0;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            if let Ok(record) = serde_json::from_str::<RecordLine>(&line) {
                last = last.max(record.id);
            }
        }
        Ok(last)
    }
}

impl EventLog for JsonlLog {
    async fn append(&self, stream: &str, fields: RecordFields) -> Result<RecordId, LogError> {
        let mut counters = self.counters.lock().await;

        let path = self.dir.stream_path(stream);
        let last = match counters.get(stream) {
            Some(last) => *last,
            None => Self::last_id_on_disk(&path)?,
        };
        let id = last + 1;

        fs::create_dir_all(self.dir.streams_dir())?;
        let line = serde_json::to_string(&RecordLine { id, fields })
            .map_err(|e| LogError::Io(std::io::Error::other(e)))?;

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        // Each record is a single line of JSON followed by a newline.
        writeln!(file, "{line}")?;
        file.sync_data()?;

        counters.insert(stream.to_owned(), id);
        Ok(RecordId(id))
    }

    async fn read_from(
        &self,
        stream: &str,
        after: Option<RecordId>,
    ) -> Result<Vec<(RecordId, RecordFields)>, LogError> {
        let path = self.dir.stream_path(stream);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LogError::Io(e)),
        };

        let mut records = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(LogError::Io)?;
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<RecordLine>(&line) {
                Ok(record) => {
                    let id = RecordId(record.id);
                    if after.is_none_or(|cursor| id > cursor) {
                        records.push((id, record.fields));
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        line = line_no + 1,
                        error = %e,
                        "skipping corrupt log line"
                    );
                }
            }
        }
        Ok(records)
    }
}
