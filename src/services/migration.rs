//! One-shot cleanup actions guarded by durable completion flags.
//!
//! [`OneTimeMigrator::run_once`] runs an action only while its flag is false
//! and writes the flag only after the action succeeded. A crash in between
//! leaves the flag unset and the action is retried on the next start, which
//! is safe because every action is idempotent (deleting an absent file is a
//! success).

use crate::metrics::Metrics;
use crate::preferences::{PreferenceError, PreferenceStore, keys};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Errors from a migration action or from recording its completion
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Failed to remove {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    /// The migration targets external storage and none is available right now
    #[error("External storage is not available")]
    StorageUnavailable,

    #[error(transparent)]
    Preferences(#[from] PreferenceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The flag was already set; the action did not run
    AlreadyDone,
    /// The action ran and the flag is now set
    Completed,
}

/// Where a migration's obsolete files live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupRoot {
    ExternalStorage,
    BaseDir,
}

/// A built-in cleanup: delete `obsolete_files` under `root`, once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub flag_key: &'static str,
    pub root: CleanupRoot,
    pub obsolete_files: &'static [&'static str],
}

/// Installer archives from older releases left on external storage
pub const CLEAN_EXTERNAL_STORAGE: Migration = Migration {
    flag_key: keys::CLEANED_EXTERNAL_STORAGE,
    root: CleanupRoot::ExternalStorage,
    obsolete_files: &[
        "Xposed-Disabler-CWM.zip",
        "Xposed-Disabler-Recovery.zip",
        "Xposed-Installer-Recovery.zip",
    ],
};

/// Debug logs written by older releases, superseded by the rotating log
pub const CLEAN_DEBUG_LOG: Migration = Migration {
    flag_key: keys::CLEANED_DEBUG_LOG,
    root: CleanupRoot::BaseDir,
    obsolete_files: &["log/debug.log", "log/debug.log.old"],
};

pub fn builtin_migrations() -> Vec<Migration> {
    vec![CLEAN_EXTERNAL_STORAGE, CLEAN_DEBUG_LOG]
}

/// Concrete locations for [`CleanupRoot`]s
#[derive(Debug, Clone)]
pub struct CleanupRoots {
    pub base_dir: Utf8PathBuf,
    pub external_storage: Option<Utf8PathBuf>,
}

impl CleanupRoots {
    /// `None` when the root is not currently available
    pub fn resolve(&self, root: CleanupRoot) -> Option<&Utf8Path> {
        match root {
            CleanupRoot::BaseDir => Some(&self.base_dir),
            CleanupRoot::ExternalStorage => self
                .external_storage
                .as_deref()
                .filter(|path| path.is_dir()),
        }
    }
}

/// Outcomes of [`OneTimeMigrator::run_all`], keyed by flag
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub completed: Vec<&'static str>,
    pub already_done: Vec<&'static str>,
    pub failed: Vec<(&'static str, MigrationError)>,
}

/// Runs guarded one-shot actions.
///
/// Owns no state between calls; the preference store is the only source of
/// truth. Thread-agnostic.
pub struct OneTimeMigrator {
    preferences: Arc<dyn PreferenceStore>,
    metrics: Arc<Metrics>,
}

impl OneTimeMigrator {
    pub fn new(preferences: Arc<dyn PreferenceStore>, metrics: Arc<Metrics>) -> Self {
        Self {
            preferences,
            metrics,
        }
    }

    /// Run `action` unless `flag_key` is already true; set the flag after success.
    pub fn run_once<F>(&self, flag_key: &str, action: F) -> Result<MigrationOutcome, MigrationError>
    where
        F: FnOnce() -> Result<(), MigrationError>,
    {
        if self.preferences.get_bool(flag_key, false) {
            tracing::trace!("Migration {} already done", flag_key);
            return Ok(MigrationOutcome::AlreadyDone);
        }

        if let Err(e) = action() {
            self.metrics.record_migration_failed();
            return Err(e);
        }

        if let Err(e) = self.preferences.set_bool(flag_key, true) {
            self.metrics.record_migration_failed();
            return Err(e.into());
        }

        self.metrics.record_migration_completed();
        tracing::info!("Migration {} completed", flag_key);
        Ok(MigrationOutcome::Completed)
    }

    /// Run every migration in order. Failures are logged and reported, never fatal.
    pub fn run_all(&self, migrations: &[Migration], roots: &CleanupRoots) -> MigrationReport {
        let mut report = MigrationReport::default();

        for migration in migrations {
            let result = self.run_once(migration.flag_key, || {
                let root = roots
                    .resolve(migration.root)
                    .ok_or(MigrationError::StorageUnavailable)?;
                for file in migration.obsolete_files {
                    remove_if_present(&root.join(file))?;
                }
                Ok(())
            });

            match result {
                Ok(MigrationOutcome::Completed) => report.completed.push(migration.flag_key),
                Ok(MigrationOutcome::AlreadyDone) => report.already_done.push(migration.flag_key),
                Err(MigrationError::StorageUnavailable) => {
                    tracing::info!(
                        "Deferring migration {}: external storage not available",
                        migration.flag_key
                    );
                    report
                        .failed
                        .push((migration.flag_key, MigrationError::StorageUnavailable));
                }
                Err(e) => {
                    tracing::warn!("Migration {} failed, will retry next start: {}", migration.flag_key, e);
                    report.failed.push((migration.flag_key, e));
                }
            }
        }

        report
    }
}

/// Delete a file, treating "already absent" as success.
///
/// # Returns
/// `true` if a file was removed
pub fn remove_if_present(path: &Utf8Path) -> Result<bool, MigrationError> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed obsolete file {}", path);
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(MigrationError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
