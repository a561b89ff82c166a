//! Integration tests for FilesystemBootstrapper
//!
//! These tests verify:
//! - The default directory set is created under the base directory
//! - Modes are re-applied on every run, healing manual changes
//! - A failing directory does not stop the others

use appcore::metrics::Metrics;
use appcore::models::{DirectorySpec, default_directories};
use appcore::services::{BootstrapError, DirectoryStatus, FilesystemBootstrapper};
use camino::Utf8PathBuf;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tempfile::TempDir;

fn create_base_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let base = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, base)
}

#[test]
fn test_default_directories_created() {
    let (_temp_dir, base) = create_base_dir();
    let metrics = Arc::new(Metrics::new());
    let bootstrapper = FilesystemBootstrapper::new(base.clone(), metrics.clone());

    let report = bootstrapper.ensure_directories(&default_directories());

    assert!(report.all_ready());
    assert_eq!(report.created(), 3);
    for dir in ["bin", "conf", "log"] {
        assert!(base.join(dir).is_dir(), "{} missing", dir);
    }
    assert_eq!(metrics.directories_ready.load(Ordering::Relaxed), 3);
}

#[test]
fn test_second_run_reports_existing() {
    let (_temp_dir, base) = create_base_dir();
    let bootstrapper = FilesystemBootstrapper::new(base, Arc::new(Metrics::new()));

    bootstrapper.ensure_directories(&default_directories());
    let report = bootstrapper.ensure_directories(&default_directories());

    assert!(report.all_ready());
    assert_eq!(report.created(), 0);
    assert!(
        report
            .outcomes
            .iter()
            .all(|o| matches!(o.result, Ok(DirectoryStatus::Existing)))
    );
}

#[cfg(unix)]
#[test]
fn test_modes_applied_and_healed() {
    use std::os::unix::fs::PermissionsExt;

    let (_temp_dir, base) = create_base_dir();
    let bootstrapper = FilesystemBootstrapper::new(base.clone(), Arc::new(Metrics::new()));
    let mode_of = |dir: &str| fs::metadata(base.join(dir)).unwrap().permissions().mode() & 0o7777;

    bootstrapper.ensure_directories(&default_directories());
    assert_eq!(mode_of("bin"), 0o771);
    assert_eq!(mode_of("conf"), 0o771);
    assert_eq!(mode_of("log"), 0o777);

    // Someone tightens the log directory between starts
    fs::set_permissions(base.join("log"), fs::Permissions::from_mode(0o755)).unwrap();
    assert_eq!(mode_of("log"), 0o755);

    let report = bootstrapper.ensure_directories(&default_directories());
    assert!(report.all_ready());
    assert_eq!(mode_of("log"), 0o777);
}

#[test]
fn test_failure_does_not_stop_remaining_directories() {
    let (_temp_dir, base) = create_base_dir();
    fs::write(base.join("conf"), "not a directory").unwrap();

    let metrics = Arc::new(Metrics::new());
    let bootstrapper = FilesystemBootstrapper::new(base.clone(), metrics.clone());
    let report = bootstrapper.ensure_directories(&default_directories());

    assert!(!report.all_ready());
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0].result,
        Err(BootstrapError::NotADirectory(_))
    ));

    assert!(base.join("bin").is_dir());
    assert!(base.join("log").is_dir());
    assert_eq!(metrics.directory_failures.load(Ordering::Relaxed), 1);
}

#[test]
fn test_escaping_path_rejected() {
    let (_temp_dir, base) = create_base_dir();
    let bootstrapper = FilesystemBootstrapper::new(base, Arc::new(Metrics::new()));

    let report = bootstrapper.ensure_directories(&[DirectorySpec::new("../outside", 0o755)]);

    assert!(matches!(
        report.outcomes[0].result,
        Err(BootstrapError::InvalidPath(_))
    ));
}
