//! Working-directory bootstrap.
//!
//! Creates each configured directory under the base directory and (re)applies
//! its access mode on every start, so a manually changed mode heals itself.
//! Best effort with complete coverage: a failure on one directory is logged
//! and recorded, and the remaining directories are still processed.

use crate::metrics::Metrics;
use crate::models::DirectorySpec;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Per-directory bootstrap failure. Never fatal.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Directory path {0} escapes the base directory")]
    InvalidPath(Utf8PathBuf),

    #[error("Failed to create directory {path}: {source}")]
    Create {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} exists but is not a directory")]
    NotADirectory(Utf8PathBuf),

    /// Modes are never applied through a link; its target may lie outside the base directory
    #[error("{0} is a symbolic link")]
    Symlink(Utf8PathBuf),

    #[error("Failed to set mode {mode:04o} on {path}: {source}")]
    SetMode {
        path: Utf8PathBuf,
        mode: u32,
        #[source]
        source: io::Error,
    },
}

/// What happened to a directory that ended up ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryStatus {
    Created,
    Existing,
}

/// Outcome of one [`DirectorySpec`]
#[derive(Debug)]
pub struct DirectoryOutcome {
    pub spec: DirectorySpec,
    pub result: Result<DirectoryStatus, BootstrapError>,
}

/// Outcomes of a bootstrap run, in input order
#[derive(Debug, Default)]
pub struct BootstrapReport {
    pub outcomes: Vec<DirectoryOutcome>,
}

impl BootstrapReport {
    pub fn all_ready(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &DirectoryOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn created(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, Ok(DirectoryStatus::Created)))
            .count()
    }
}

/// Idempotent creator of the working directories under one base directory.
///
/// Thread-agnostic; intended to run once at startup before any screen exists.
#[derive(Debug, Clone)]
pub struct FilesystemBootstrapper {
    base_dir: Utf8PathBuf,
    metrics: Arc<Metrics>,
}

impl FilesystemBootstrapper {
    pub fn new(base_dir: impl Into<Utf8PathBuf>, metrics: Arc<Metrics>) -> Self {
        Self {
            base_dir: base_dir.into(),
            metrics,
        }
    }

    pub fn base_dir(&self) -> &Utf8Path {
        &self.base_dir
    }

    /// Ensure every directory exists with its mode, in order.
    pub fn ensure_directories(&self, specs: &[DirectorySpec]) -> BootstrapReport {
        let mut report = BootstrapReport::default();

        for spec in specs {
            let result = self.ensure_directory(spec);
            match &result {
                Ok(status) => {
                    self.metrics.record_directory_ready();
                    tracing::debug!("Directory {} ready ({:?}, mode {:04o})", spec.path, status, spec.mode);
                }
                Err(e) => {
                    self.metrics.record_directory_failure();
                    tracing::warn!("Directory setup failed, continuing: {}", e);
                }
            }
            report.outcomes.push(DirectoryOutcome {
                spec: spec.clone(),
                result,
            });
        }

        tracing::info!(
            "Directory bootstrap: {} of {} ready ({} created)",
            report.outcomes.iter().filter(|o| o.result.is_ok()).count(),
            specs.len(),
            report.created()
        );

        report
    }

    /// Create one directory if absent and apply its mode.
    pub fn ensure_directory(&self, spec: &DirectorySpec) -> Result<DirectoryStatus, BootstrapError> {
        if !spec.is_confined() {
            return Err(BootstrapError::InvalidPath(spec.path.clone()));
        }

        let path = spec.resolve(&self.base_dir);

        let status = match fs::create_dir(&path) {
            Ok(()) => DirectoryStatus::Created,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let file_type = fs::symlink_metadata(&path)
                    .map_err(|source| BootstrapError::Create {
                        path: path.clone(),
                        source,
                    })?
                    .file_type();
                if file_type.is_symlink() {
                    return Err(BootstrapError::Symlink(path));
                }
                if !file_type.is_dir() {
                    return Err(BootstrapError::NotADirectory(path));
                }
                DirectoryStatus::Existing
            }
            Err(source) => return Err(BootstrapError::Create { path, source }),
        };

        apply_mode(&path, spec.mode)?;
        Ok(status)
    }
}

#[cfg(unix)]
fn apply_mode(path: &Utf8Path, mode: u32) -> Result<(), BootstrapError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|source| {
        BootstrapError::SetMode {
            path: path.to_path_buf(),
            mode,
            source,
        }
    })
}

#[cfg(not(unix))]
fn apply_mode(path: &Utf8Path, mode: u32) -> Result<(), BootstrapError> {
    tracing::debug!("Skipping mode {:04o} on {}: not supported on this platform", mode, path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bootstrapper() -> (TempDir, FilesystemBootstrapper) {
        let temp_dir = TempDir::new().unwrap();
        let base = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (temp_dir, FilesystemBootstrapper::new(base, Arc::new(Metrics::new())))
    }

    #[test]
    fn test_creates_missing_directory() {
        let (_temp_dir, bootstrapper) = bootstrapper();
        let spec = DirectorySpec::new("bin", 0o771);

        let status = bootstrapper.ensure_directory(&spec).unwrap();

        assert_eq!(status, DirectoryStatus::Created);
        assert!(bootstrapper.base_dir().join("bin").is_dir());
    }

    #[test]
    fn test_second_run_reports_existing() {
        let (_temp_dir, bootstrapper) = bootstrapper();
        let spec = DirectorySpec::new("conf", 0o771);

        bootstrapper.ensure_directory(&spec).unwrap();
        assert_eq!(bootstrapper.ensure_directory(&spec).unwrap(), DirectoryStatus::Existing);
    }

    #[test]
    fn test_rejects_escaping_path() {
        let (_temp_dir, bootstrapper) = bootstrapper();
        let spec = DirectorySpec::new("../outside", 0o771);

        assert!(matches!(
            bootstrapper.ensure_directory(&spec),
            Err(BootstrapError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_failure_does_not_abort_later_specs() {
        let (_temp_dir, bootstrapper) = bootstrapper();
        fs::write(bootstrapper.base_dir().join("conf"), b"not a dir").unwrap();

        let report = bootstrapper.ensure_directories(&[
            DirectorySpec::new("bin", 0o771),
            DirectorySpec::new("conf", 0o771),
            DirectorySpec::new("log", 0o777),
        ]);

        assert!(!report.all_ready());
        assert_eq!(report.failures().count(), 1);
        assert!(matches!(
            report.outcomes[1].result,
            Err(BootstrapError::NotADirectory(_))
        ));
        assert!(bootstrapper.base_dir().join("log").is_dir());
    }

    #[test]
    fn test_missing_parent_is_reported() {
        let (_temp_dir, bootstrapper) = bootstrapper();
        let spec = DirectorySpec::new("missing/child", 0o771);

        assert!(matches!(
            bootstrapper.ensure_directory(&spec),
            Err(BootstrapError::Create { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_mode_applied_regardless_of_umask() {
        use std::os::unix::fs::PermissionsExt;

        let (_temp_dir, bootstrapper) = bootstrapper();
        bootstrapper.ensure_directory(&DirectorySpec::new("log", 0o777)).unwrap();

        let mode = fs::metadata(bootstrapper.base_dir().join("log"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o7777, 0o777);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_not_chmoded() {
        use std::os::unix::fs::{PermissionsExt, symlink};

        let (temp_dir, bootstrapper) = bootstrapper();
        let outside = TempDir::new().unwrap();
        fs::set_permissions(outside.path(), fs::Permissions::from_mode(0o700)).unwrap();
        symlink(outside.path(), temp_dir.path().join("log")).unwrap();

        let result = bootstrapper.ensure_directory(&DirectorySpec::new("log", 0o777));

        assert!(matches!(result, Err(BootstrapError::Symlink(_))));
        let mode = fs::metadata(outside.path()).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o700);
    }
}
