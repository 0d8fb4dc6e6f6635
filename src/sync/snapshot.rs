//! Durable, sequence-numbered configuration snapshots.
//!
//! Layout under `<config_dir>/snapshots/`:
//! - `config-<seq>.json`, `seq` zero-padded to 20 digits
//! - `last-good`, holding the sequence of the last pushed snapshot
//!
//! Files are written to a dot-prefixed temp name and renamed into place, so a
//! reader never sees a partial snapshot.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::Config;

const DIR_NAME: &str = "snapshots";
const FILE_PREFIX: &str = "config-";
const FILE_SUFFIX: &str = ".json";
const LAST_GOOD_FILE: &str = "last-good";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("snapshot {path} is unreadable: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("snapshot {0} not found")]
    NotFound(u64),

    #[error("last-good marker {path} is corrupt: {content:?}")]
    Marker { path: PathBuf, content: String },
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// A snapshot file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub seq: u64,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            dir: config_dir.join(DIR_NAME),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, seq: u64) -> PathBuf {
        self.dir.join(format!("{}{:020}{}", FILE_PREFIX, seq, FILE_SUFFIX))
    }

    /// All snapshots, oldest first. A missing directory means none.
    pub fn list(&self) -> SnapshotResult<Vec<Snapshot>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_err(&self.dir, e)),
        };

        let mut snapshots = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.io_err(&self.dir, e))?;
            let name = entry.file_name();
            if let Some(seq) = name.to_str().and_then(parse_seq) {
                snapshots.push(Snapshot {
                    seq,
                    path: entry.path(),
                });
            }
        }

        snapshots.sort_by_key(|s| s.seq);
        Ok(snapshots)
    }

    /// Persist `config` under the next sequence number.
    pub fn save(&self, config: &Config) -> SnapshotResult<Snapshot> {
        fs::create_dir_all(&self.dir).map_err(|e| self.io_err(&self.dir, e))?;

        let newest = self.list()?.last().map(|s| s.seq).unwrap_or(0);
        let seq = newest.max(self.last_good()?.unwrap_or(0)) + 1;

        let data = serde_json::to_vec_pretty(config).map_err(SnapshotError::Encode)?;
        let path = self.path_for(seq);
        self.write_atomic(&path, &data)?;

        tracing::debug!(seq, path = %path.display(), "Snapshot saved");
        Ok(Snapshot { seq, path })
    }

    pub fn load(&self, seq: u64) -> SnapshotResult<Config> {
        let path = self.path_for(seq);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SnapshotError::NotFound(seq))
            }
            Err(e) => return Err(self.io_err(&path, e)),
        };
        serde_json::from_slice(&data).map_err(|source| SnapshotError::Decode { path, source })
    }

    /// Record `seq` as the last snapshot the proxy accepted.
    pub fn mark_good(&self, seq: u64) -> SnapshotResult<()> {
        self.write_atomic(&self.dir.join(LAST_GOOD_FILE), seq.to_string().as_bytes())
    }

    pub fn last_good(&self) -> SnapshotResult<Option<u64>> {
        let path = self.dir.join(LAST_GOOD_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(&path, e)),
        };
        content
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SnapshotError::Marker { path, content })
    }

    /// Newest snapshot with a sequence below `seq`.
    pub fn previous_before(&self, seq: u64) -> SnapshotResult<Option<u64>> {
        Ok(self
            .list()?
            .into_iter()
            .map(|s| s.seq)
            .filter(|&s| s < seq)
            .max())
    }

    /// Delete the oldest snapshots until at most `keep` remain. The last-good
    /// snapshot is never deleted. Returns the number removed.
    pub fn prune(&self, keep: usize) -> SnapshotResult<usize> {
        let snapshots = self.list()?;
        if snapshots.len() <= keep {
            return Ok(0);
        }

        let protected = self.last_good()?;
        let excess = snapshots.len() - keep;
        let mut removed = 0;
        for snapshot in snapshots.iter().filter(|s| Some(s.seq) != protected).take(excess) {
            fs::remove_file(&snapshot.path).map_err(|e| self.io_err(&snapshot.path, e))?;
            removed += 1;
        }
        Ok(removed)
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> SnapshotResult<()> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!(".{}.tmp", file_name));

        fs::write(&tmp, data).map_err(|e| self.io_err(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| self.io_err(path, e))
    }

    fn io_err(&self, path: &Path, source: io::Error) -> SnapshotError {
        SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn parse_seq(name: &str) -> Option<u64> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Storage;
    use tempfile::tempdir;

    fn config(root: &str) -> Config {
        Config {
            storage: Some(Storage {
                module: "file_system".to_string(),
                root: root.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_save_assigns_increasing_sequence() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.list().unwrap().is_empty());

        let first = store.save(&config("a")).unwrap();
        let second = store.save(&config("b")).unwrap();
        assert_eq!((first.seq, second.seq), (1, 2));
        assert!(second.path.ends_with("snapshots/config-00000000000000000002.json"));

        assert_eq!(store.load(2).unwrap(), config("b"));
        assert!(matches!(store.load(9), Err(SnapshotError::NotFound(9))));
    }

    #[test]
    fn test_list_ignores_foreign_files() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.save(&config("a")).unwrap();
        fs::write(store.dir().join("notes.txt"), "x").unwrap();
        fs::write(store.dir().join(".config-00000000000000000009.json.tmp"), "{").unwrap();

        let seqs: Vec<u64> = store.list().unwrap().iter().map(|s| s.seq).collect();
        assert_eq!(seqs, vec![1]);
    }

    #[test]
    fn test_last_good_marker() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert_eq!(store.last_good().unwrap(), None);

        store.save(&config("a")).unwrap();
        store.mark_good(1).unwrap();
        assert_eq!(store.last_good().unwrap(), Some(1));

        fs::write(store.dir().join(LAST_GOOD_FILE), "garbage").unwrap();
        assert!(matches!(store.last_good(), Err(SnapshotError::Marker { .. })));
    }

    #[test]
    fn test_sequence_continues_past_marker() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.save(&config("a")).unwrap();
        store.mark_good(7).unwrap();
        assert_eq!(store.save(&config("b")).unwrap().seq, 8);
    }

    #[test]
    fn test_previous_before() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        for root in ["a", "b", "c"] {
            store.save(&config(root)).unwrap();
        }
        assert_eq!(store.previous_before(3).unwrap(), Some(2));
        assert_eq!(store.previous_before(1).unwrap(), None);
    }

    #[test]
    fn test_prune_keeps_newest_and_last_good() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        for i in 0..6 {
            store.save(&config(&i.to_string())).unwrap();
        }
        store.mark_good(1).unwrap();

        let removed = store.prune(3).unwrap();
        assert_eq!(removed, 3);
        let seqs: Vec<u64> = store.list().unwrap().iter().map(|s| s.seq).collect();
        assert_eq!(seqs, vec![1, 5, 6]);

        assert_eq!(store.prune(10).unwrap(), 0);
    }
}
