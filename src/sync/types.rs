//! Sync engine types and errors.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::ClientError;
use crate::compile::CompileError;
use crate::records::StoreError;
use crate::sync::snapshot::SnapshotError;
use crate::validate::ValidationError;

/// Phase of an apply cycle. The last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplyState {
    Compiling,
    Validating,
    Snapshotting,
    Applying,
    Success,
    RolledBack,
    Failed,
}

impl ApplyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyState::Compiling => "compiling",
            ApplyState::Validating => "validating",
            ApplyState::Snapshotting => "snapshotting",
            ApplyState::Applying => "applying",
            ApplyState::Success => "success",
            ApplyState::RolledBack => "rolled_back",
            ApplyState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplyState::Success | ApplyState::RolledBack | ApplyState::Failed
        )
    }
}

impl fmt::Display for ApplyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which snapshot a failed push rolls back to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackTarget {
    /// The snapshot of the last cycle whose push succeeded.
    #[default]
    LastKnownGood,

    /// The newest snapshot older than the failing cycle's own, applied or not.
    Previous,
}

/// Outcome of a successful apply cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    /// Sequence number of the snapshot that was pushed.
    pub snapshot_seq: u64,

    /// SHA-256 (hex) of the pushed document.
    pub config_hash: String,

    /// Routes in the pushed document.
    pub routes: usize,

    /// Snapshots removed by retention. Zero if pruning failed.
    pub pruned: usize,
}

#[derive(Debug, Error)]
pub enum RollbackError {
    #[error("no snapshot available for rollback")]
    Unavailable,

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("rollback push failed: {0}")]
    Push(#[from] ClientError),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to read desired state: {0}")]
    Store(#[from] StoreError),

    #[error("generate config: {0}")]
    Compile(#[from] CompileError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("save snapshot: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("apply failed, rolled back to snapshot {restored}: {source}")]
    RolledBack { restored: u64, source: ClientError },

    #[error("apply failed: {apply}, rollback also failed: {rollback}")]
    RollbackFailed {
        apply: ClientError,
        rollback: RollbackError,
    },
}

impl SyncError {
    /// Terminal state of the cycle that produced this error.
    pub fn state(&self) -> ApplyState {
        match self {
            SyncError::RolledBack { .. } => ApplyState::RolledBack,
            _ => ApplyState::Failed,
        }
    }

    /// The proxy's live state is unknown relative to the store.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, SyncError::RollbackFailed { .. })
    }
}
