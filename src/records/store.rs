//! Record store boundary.
//!
//! The persistent store is owned by the CRUD layer. This module defines what
//! the sync engine needs from it, plus two implementations: a JSON file store
//! used by the CLI and an in-memory store used in tests and embedding.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::records::types::{AuditRecord, RoutingRecord};

/// Errors from the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// What the sync engine reads from and writes to the store.
pub trait RecordStore: Send + Sync {
    /// All records, enabled or not, in stable order.
    fn list_records(&self) -> StoreResult<Vec<RoutingRecord>>;

    /// A single string setting.
    fn setting(&self, key: &str) -> StoreResult<Option<String>>;

    /// Append one audit row.
    fn append_audit(&self, record: &AuditRecord) -> StoreResult<()>;

    /// Audit rows, oldest first.
    fn audit_log(&self) -> StoreResult<Vec<AuditRecord>>;
}

/// On-disk layout of the records file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreFile {
    pub records: Vec<RoutingRecord>,
    pub settings: BTreeMap<String, String>,
}

/// Records and settings in one JSON file, audit rows as JSON lines.
#[derive(Debug)]
pub struct JsonFileStore {
    records_path: PathBuf,
    audit_path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(records_path: impl Into<PathBuf>, audit_path: impl Into<PathBuf>) -> Self {
        Self {
            records_path: records_path.into(),
            audit_path: audit_path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn records_path(&self) -> &Path {
        &self.records_path
    }

    /// Read the records file. A missing file is an empty store.
    pub fn load(&self) -> StoreResult<StoreFile> {
        if !self.records_path.exists() {
            return Ok(StoreFile::default());
        }
        let file = File::open(&self.records_path).map_err(|source| StoreError::Io {
            path: self.records_path.clone(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Malformed {
            path: self.records_path.clone(),
            source,
        })
    }

    /// Append records and persist. Used when committing an import.
    pub fn insert_records(&self, records: Vec<RoutingRecord>) -> StoreResult<usize> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut contents = self.load()?;
        let added = records.len();
        contents.records.extend(records);
        self.save(&contents)?;
        tracing::info!(added, total = contents.records.len(), "Records saved");
        Ok(added)
    }

    fn save(&self, contents: &StoreFile) -> StoreResult<()> {
        let io_err = |source| StoreError::Io {
            path: self.records_path.clone(),
            source,
        };
        if let Some(parent) = self.records_path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let body = serde_json::to_vec_pretty(contents).map_err(|source| StoreError::Malformed {
            path: self.records_path.clone(),
            source,
        })?;
        let tmp = self.records_path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(io_err)?;
        fs::rename(&tmp, &self.records_path).map_err(io_err)
    }
}

impl RecordStore for JsonFileStore {
    fn list_records(&self) -> StoreResult<Vec<RoutingRecord>> {
        Ok(self.load()?.records)
    }

    fn setting(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.load()?.settings.get(key).cloned())
    }

    fn append_audit(&self, record: &AuditRecord) -> StoreResult<()> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let io_err = |source| StoreError::Io {
            path: self.audit_path.clone(),
            source,
        };
        if let Some(parent) = self.audit_path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_path)
            .map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, record).map_err(|source| StoreError::Malformed {
            path: self.audit_path.clone(),
            source,
        })?;
        writer.write_all(b"\n").map_err(io_err)?;
        writer.flush().map_err(io_err)
    }

    fn audit_log(&self) -> StoreResult<Vec<AuditRecord>> {
        if !self.audit_path.exists() {
            return Ok(Vec::new());
        }
        let io_err = |source| StoreError::Io {
            path: self.audit_path.clone(),
            source,
        };
        let file = File::open(&self.audit_path).map_err(io_err)?;
        let mut rows = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(io_err)?;
            if line.trim().is_empty() {
                continue;
            }
            let row = serde_json::from_str(&line).map_err(|source| StoreError::Malformed {
                path: self.audit_path.clone(),
                source,
            })?;
            rows.push(row);
        }
        Ok(rows)
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    records: Vec<RoutingRecord>,
    settings: BTreeMap<String, String>,
    audit: Vec<AuditRecord>,
}

impl MemoryStore {
    pub fn new(records: Vec<RoutingRecord>) -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                records,
                ..Default::default()
            }),
        }
    }

    pub fn set_setting(&self, key: impl Into<String>, value: impl Into<String>) -> StoreResult<()> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        inner.settings.insert(key.into(), value.into());
        Ok(())
    }

    pub fn replace_records(&self, records: Vec<RoutingRecord>) -> StoreResult<()> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        inner.records = records;
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn list_records(&self) -> StoreResult<Vec<RoutingRecord>> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.records.clone())
    }

    fn setting(&self, key: &str) -> StoreResult<Option<String>> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.settings.get(key).cloned())
    }

    fn append_audit(&self, record: &AuditRecord) -> StoreResult<()> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        inner.audit.push(record.clone());
        Ok(())
    }

    fn audit_log(&self) -> StoreResult<Vec<AuditRecord>> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.audit.clone())
    }
}
