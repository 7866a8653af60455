//! Export metadata records.
//!
//! Every successful export upserts one record per (owner, book). Writing the
//! record is best effort: a failing store is logged and the export still
//! succeeds.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Status written for a finished export.
pub const STATUS_EXPORTED: &str = "exported";

/// One export, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Unique id of this export
    pub id: String,

    /// ISO 8601 timestamp of the export
    pub exported_at: DateTime<Utc>,

    /// Who requested the export (empty for anonymous callers)
    #[serde(default)]
    pub owner: String,

    pub book_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_id: Option<String>,

    pub title: String,

    pub page_count: u32,

    /// Book and cover theme ids in use
    #[serde(default)]
    pub theme_ids: Vec<String>,

    pub status: String,

    pub filename: String,

    /// Hex SHA-256 of the PDF bytes
    pub sha256: String,
}

impl ExportRecord {
    /// Key used for upserts.
    pub fn key(&self) -> (String, String) {
        (self.owner.clone(), self.book_id.clone())
    }
}

/// Persistence seam for export records.
pub trait MetadataStore: Send + Sync {
    /// Insert or replace the record for the same owner and book.
    fn upsert(&self, record: &ExportRecord) -> Result<()>;

    /// Latest record per (owner, book), ordered by export time.
    fn records(&self) -> Result<Vec<ExportRecord>>;

    /// Get the backend name (for display purposes).
    fn backend_type(&self) -> &'static str;
}

/// Keep the newest record per key, ordered by export time.
fn latest(records: impl IntoIterator<Item = ExportRecord>) -> Vec<ExportRecord> {
    let mut by_key: HashMap<(String, String), ExportRecord> = HashMap::new();
    for record in records {
        by_key.insert(record.key(), record);
    }
    let mut out: Vec<ExportRecord> = by_key.into_values().collect();
    out.sort_by(|a, b| a.exported_at.cmp(&b.exported_at).then(a.id.cmp(&b.id)));
    out
}

/// Append-only JSONL file. Later lines supersede earlier ones with the same key.
#[derive(Debug)]
pub struct JsonlMetadataStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlMetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Default location: `~/.local/share/bindery/exports.jsonl`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("bindery").join("exports.jsonl"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetadataStore for JsonlMetadataStore {
    fn upsert(&self, record: &ExportRecord) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| Error::Other("metadata log lock poisoned".to_string()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let json = serde_json::to_string(record)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }

    fn records(&self) -> Result<Vec<ExportRecord>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut parsed = Vec::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<ExportRecord>(line) {
                Ok(record) => parsed.push(record),
                Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "skipping bad metadata line"),
            }
        }
        Ok(latest(parsed))
    }

    fn backend_type(&self) -> &'static str {
        "jsonl"
    }
}

/// Process-local store, used by the HTTP server when no log file is configured.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: Mutex<HashMap<(String, String), ExportRecord>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn upsert(&self, record: &ExportRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| Error::Other("metadata store lock poisoned".to_string()))?;
        records.insert(record.key(), record.clone());
        Ok(())
    }

    fn records(&self) -> Result<Vec<ExportRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| Error::Other("metadata store lock poisoned".to_string()))?;
        Ok(latest(records.values().cloned()))
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(owner: &str, book: &str, pages: u32) -> ExportRecord {
        ExportRecord {
            id: uuid::Uuid::new_v4().to_string(),
            exported_at: Utc::now(),
            owner: owner.to_string(),
            book_id: book.to_string(),
            story_id: None,
            title: "T".to_string(),
            page_count: pages,
            theme_ids: vec![],
            status: STATUS_EXPORTED.to_string(),
            filename: "t.pdf".to_string(),
            sha256: String::new(),
        }
    }

    #[test]
    fn test_memory_store_upserts_by_owner_and_book() {
        let store = MemoryMetadataStore::new();
        store.upsert(&record("alice", "b1", 3)).unwrap();
        store.upsert(&record("alice", "b1", 5)).unwrap();
        store.upsert(&record("bob", "b1", 2)).unwrap();

        let records = store.records().unwrap();
        assert_eq!(records.len(), 2);
        let alice = records.iter().find(|r| r.owner == "alice").unwrap();
        assert_eq!(alice.page_count, 5);
    }

    #[test]
    fn test_jsonl_store_latest_line_wins() {
        let dir = TempDir::new().unwrap();
        let store = JsonlMetadataStore::new(dir.path().join("nested").join("exports.jsonl"));
        assert!(store.records().unwrap().is_empty());

        store.upsert(&record("alice", "b1", 3)).unwrap();
        store.upsert(&record("alice", "b1", 4)).unwrap();
        store.upsert(&record("alice", "b2", 1)).unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text.lines().count(), 3);

        let records = store.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records.iter().find(|r| r.book_id == "b1").unwrap().page_count, 4);
    }

    #[test]
    fn test_jsonl_store_skips_corrupt_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exports.jsonl");
        let good = serde_json::to_string(&record("a", "b", 1)).unwrap();
        std::fs::write(&path, format!("not json\n{}\n", good)).unwrap();

        let store = JsonlMetadataStore::new(&path);
        assert_eq!(store.records().unwrap().len(), 1);
    }

    #[test]
    fn test_jsonl_store_unwritable_path_errors() {
        let dir = TempDir::new().unwrap();
        // a directory where the file should be
        let store = JsonlMetadataStore::new(dir.path());
        assert!(store.upsert(&record("a", "b", 1)).is_err());
    }
}
