//! Transactional apply cycle.
//!
//! # Responsibilities
//! - Compile and validate the desired state from the record store
//! - Snapshot every validated document before it is pushed
//! - Push; on failure roll back exactly once
//! - Audit each attempt, prune old snapshots after success

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::client::{AdminClient, ClientError};
use crate::compile::compile;
use crate::model::Config;
use crate::observability::metrics;
use crate::records::{AuditRecord, RecordStore, ACME_EMAIL_SETTING};
use crate::sync::snapshot::SnapshotStore;
use crate::sync::types::{ApplyReport, ApplyState, RollbackError, RollbackTarget, SyncError};
use crate::validate::{validate, ValidationError};

pub const DEFAULT_SNAPSHOT_KEEP: usize = 10;

/// Drives one proxy instance towards the state held in a [`RecordStore`].
///
/// Calls to [`SyncManager::apply_config`] must be serialized by the caller;
/// two overlapping cycles can interleave their snapshots and pushes.
pub struct SyncManager {
    client: AdminClient,
    store: Arc<dyn RecordStore>,
    snapshots: SnapshotStore,
    storage_root: PathBuf,
    keep: usize,
    rollback_target: RollbackTarget,
}

impl SyncManager {
    /// Create a manager that snapshots under `config_dir` and points the
    /// proxy's certificate storage at `<config_dir>/data`.
    pub fn new(
        client: AdminClient,
        store: Arc<dyn RecordStore>,
        config_dir: impl Into<PathBuf>,
    ) -> Self {
        let config_dir = config_dir.into();
        Self {
            client,
            store,
            snapshots: SnapshotStore::new(&config_dir),
            storage_root: config_dir.join("data"),
            keep: DEFAULT_SNAPSHOT_KEEP,
            rollback_target: RollbackTarget::default(),
        }
    }

    /// Number of snapshots kept after a successful apply (at least one).
    pub fn with_retention(mut self, keep: usize) -> Self {
        self.keep = keep.max(1);
        self
    }

    pub fn with_rollback_target(mut self, target: RollbackTarget) -> Self {
        self.rollback_target = target;
        self
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Compile and validate the desired state without touching the proxy or
    /// the snapshot directory.
    pub fn render(&self) -> Result<Config, SyncError> {
        tracing::debug!(state = %ApplyState::Compiling, "Loading desired state");
        let records = self.store.list_records()?;
        let email = self.store.setting(ACME_EMAIL_SETTING)?.unwrap_or_default();
        let config = compile(&records, &self.storage_root, &email)?;

        tracing::debug!(
            state = %ApplyState::Validating,
            records = records.len(),
            "Validating config"
        );
        validate(&config)?;
        Ok(config)
    }

    /// Run one apply cycle: compile, validate, snapshot, push.
    pub async fn apply_config(&self) -> Result<ApplyReport, SyncError> {
        let start = Instant::now();
        let result = self.run_cycle().await;

        let state = match &result {
            Ok(_) => ApplyState::Success,
            Err(e) => e.state(),
        };
        metrics::record_apply(state.as_str(), start);
        result
    }

    async fn run_cycle(&self) -> Result<ApplyReport, SyncError> {
        let config = self.render()?;
        let hash = config_hash(&config).map_err(|e| ValidationError::Serialize(e.to_string()))?;

        tracing::debug!(state = %ApplyState::Snapshotting, "Saving snapshot");
        let snapshot = self.snapshots.save(&config)?;

        tracing::debug!(
            state = %ApplyState::Applying,
            seq = snapshot.seq,
            hash = %hash,
            "Pushing config"
        );
        let apply = match self.client.load(&config).await {
            Ok(()) => return Ok(self.finish_success(&config, snapshot.seq, hash)),
            Err(e) => e,
        };

        tracing::warn!(seq = snapshot.seq, error = %apply, "Apply failed, rolling back");
        match self.rollback(snapshot.seq).await {
            Ok(restored) => {
                self.audit(&hash, Some(apply.to_string()));
                tracing::warn!(
                    state = %ApplyState::RolledBack,
                    failed_seq = snapshot.seq,
                    restored_seq = restored,
                    "Rolled back to earlier snapshot"
                );
                Err(SyncError::RolledBack {
                    restored,
                    source: apply,
                })
            }
            Err(rollback) => {
                let err = SyncError::RollbackFailed { apply, rollback };
                self.audit(&hash, Some(err.to_string()));
                tracing::error!(
                    state = %ApplyState::Failed,
                    seq = snapshot.seq,
                    error = %err,
                    "Rollback failed; proxy state is unknown"
                );
                Err(err)
            }
        }
    }

    fn finish_success(&self, config: &Config, seq: u64, hash: String) -> ApplyReport {
        self.audit(&hash, None);

        if let Err(e) = self.snapshots.mark_good(seq) {
            tracing::warn!(seq, error = %e, "Failed to record last-good snapshot");
        }

        let pruned = match self.snapshots.prune(self.keep) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, "Snapshot rotation failed");
                0
            }
        };
        if let Ok(list) = self.snapshots.list() {
            metrics::record_snapshot_count(list.len());
        }

        let routes: usize = config.servers().map(|(_, s)| s.routes.len()).sum();
        tracing::info!(
            state = %ApplyState::Success,
            seq,
            hash = %hash,
            routes,
            pruned,
            "Configuration applied"
        );

        ApplyReport {
            snapshot_seq: seq,
            config_hash: hash,
            routes,
            pruned,
        }
    }

    async fn rollback(&self, failed_seq: u64) -> Result<u64, RollbackError> {
        let target = match self.rollback_target {
            RollbackTarget::LastKnownGood => self.snapshots.last_good()?,
            RollbackTarget::Previous => self.snapshots.previous_before(failed_seq)?,
        }
        .ok_or(RollbackError::Unavailable)?;

        let config = self.snapshots.load(target)?;
        self.client.load(&config).await?;
        Ok(target)
    }

    fn audit(&self, hash: &str, error: Option<String>) {
        let record = AuditRecord {
            config_hash: hash.to_string(),
            applied_at: Utc::now(),
            success: error.is_none(),
            error,
        };
        if let Err(e) = self.store.append_audit(&record) {
            tracing::warn!(error = %e, "Failed to write audit record");
        }
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        self.client.ping().await
    }

    /// The document the proxy is running now.
    pub async fn current_config(&self) -> Result<Config, ClientError> {
        self.client.get_config().await
    }
}

/// SHA-256 (hex) of the compact JSON encoding.
pub fn config_hash(config: &Config) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(config)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}
