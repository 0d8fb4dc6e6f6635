//! Legacy-format adapters.
//!
//! An adapter turns a legacy configuration file into the JSON document shape
//! of [`crate::model::Config`]. The importer only sees the trait, so tests
//! substitute a fake without spawning anything.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::import::types::ImportError;

pub const DEFAULT_BINARY: &str = "caddy";

pub trait ConfigAdapter: Send + Sync {
    /// Translate the file at `path`. Returns the JSON document bytes.
    fn adapt(&self, path: &Path) -> Result<Vec<u8>, ImportError>;

    /// Check that the adapter can run at all.
    fn check_available(&self) -> Result<(), ImportError>;
}

/// Runs `<binary> adapt --config <path> --adapter caddyfile`.
#[derive(Debug, Clone)]
pub struct CaddyfileAdapter {
    binary: PathBuf,
}

impl CaddyfileAdapter {
    /// An empty `binary` falls back to `caddy` on `PATH`.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        let binary = binary.into();
        let binary = if binary.as_os_str().is_empty() {
            PathBuf::from(DEFAULT_BINARY)
        } else {
            binary
        };
        Self { binary }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn binary_name(&self) -> String {
        self.binary.display().to_string()
    }
}

impl Default for CaddyfileAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY)
    }
}

impl ConfigAdapter for CaddyfileAdapter {
    fn adapt(&self, path: &Path) -> Result<Vec<u8>, ImportError> {
        let output = Command::new(&self.binary)
            .arg("adapt")
            .arg("--config")
            .arg(path)
            .args(["--adapter", "caddyfile"])
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ImportError::Spawn {
                binary: self.binary_name(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ImportError::Adapter(format!(
                "{} adapt exited with {}: {}",
                self.binary_name(),
                output.status,
                stderr.trim()
            )));
        }

        tracing::debug!(
            binary = %self.binary.display(),
            path = %path.display(),
            bytes = output.stdout.len(),
            "Adapted legacy config"
        );
        Ok(output.stdout)
    }

    fn check_available(&self) -> Result<(), ImportError> {
        let status = Command::new(&self.binary)
            .arg("version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(ImportError::Unavailable(self.binary_name())),
        }
    }
}
