//! File import: adapt, extract, back up.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::import::adapter::ConfigAdapter;
use crate::import::extract::extract_hosts;
use crate::import::types::{ImportError, ImportResult};
use crate::observability::metrics;

pub struct Importer {
    adapter: Box<dyn ConfigAdapter>,
    backup_dir: Option<PathBuf>,
}

impl Importer {
    pub fn new(adapter: impl ConfigAdapter + 'static) -> Self {
        Self {
            adapter: Box::new(adapter),
            backup_dir: None,
        }
    }

    /// Copy each successfully imported file into `dir`.
    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(dir.into());
        self
    }

    pub fn check_available(&self) -> Result<(), ImportError> {
        self.adapter.check_available()
    }

    /// Adapt the file at `path` and extract host candidates from it.
    ///
    /// Either the whole file is translated or nothing is returned. The backup
    /// that follows a successful import is best-effort.
    pub fn import_file(&self, path: &Path) -> Result<ImportResult, ImportError> {
        if !path.exists() {
            return Err(ImportError::NotFound(path.to_path_buf()));
        }

        let json = self.adapter.adapt(path)?;
        let result = extract_hosts(&json)?;

        metrics::record_import_hosts(result.hosts.len());
        tracing::info!(
            path = %path.display(),
            hosts = result.hosts.len(),
            conflicts = result.conflicts.len(),
            "Import parsed"
        );

        if let Some(dir) = &self.backup_dir {
            match backup_file(path, dir) {
                Ok(backup) => tracing::info!(backup = %backup.display(), "Source file backed up"),
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to back up source file"
                ),
            }
        }

        Ok(result)
    }
}

/// Copy `original` to `<backup_dir>/<file name>.<UTC timestamp>.backup`.
pub fn backup_file(original: &Path, backup_dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(backup_dir)?;

    let name = original
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".to_string());
    let timestamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    let backup = backup_dir.join(format!("{}.{}.backup", name, timestamp));

    fs::copy(original, &backup)?;
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct FakeAdapter(&'static str);

    impl ConfigAdapter for FakeAdapter {
        fn adapt(&self, _path: &Path) -> Result<Vec<u8>, ImportError> {
            Ok(self.0.as_bytes().to_vec())
        }

        fn check_available(&self) -> Result<(), ImportError> {
            Ok(())
        }
    }

    const ADAPTED: &str = r#"{"apps":{"http":{"servers":{"srv0":{"listen":[":443"],"routes":[
        {"match":[{"host":["a.example.com"]}],"handle":[{"handler":"reverse_proxy","upstreams":[{"dial":"a:80"}]}]}
    ]}}}}}"#;

    #[test]
    fn test_missing_file() {
        let importer = Importer::new(FakeAdapter(ADAPTED));
        let err = importer.import_file(Path::new("/nonexistent/Caddyfile")).unwrap_err();
        assert!(matches!(err, ImportError::NotFound(_)));
    }

    #[test]
    fn test_import_with_backup() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Caddyfile");
        fs::write(&source, "a.example.com {\n  reverse_proxy a:80\n}\n").unwrap();
        let backups = dir.path().join("backups");

        let importer = Importer::new(FakeAdapter(ADAPTED)).with_backup_dir(&backups);
        let result = importer.import_file(&source).unwrap();
        assert_eq!(result.hosts.len(), 1);
        assert_eq!(result.hosts[0].forward_port, 80);

        let copies: Vec<_> = fs::read_dir(&backups).unwrap().collect();
        assert_eq!(copies.len(), 1);
        let name = copies[0].as_ref().unwrap().file_name();
        let name = name.to_string_lossy();
        assert!(name.starts_with("Caddyfile.") && name.ends_with(".backup"));
    }

    #[test]
    fn test_backup_failure_is_not_fatal() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Caddyfile");
        fs::write(&source, "").unwrap();
        // A regular file where the backup directory should be.
        let blocked = dir.path().join("blocked");
        fs::write(&blocked, "").unwrap();

        let importer = Importer::new(FakeAdapter(ADAPTED)).with_backup_dir(&blocked);
        assert!(importer.import_file(&source).is_ok());
    }

    #[test]
    fn test_bad_adapter_output() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Caddyfile");
        fs::write(&source, "").unwrap();

        let importer = Importer::new(FakeAdapter("{\"apps\": "));
        assert!(matches!(importer.import_file(&source), Err(ImportError::Parse(_))));
    }
}
