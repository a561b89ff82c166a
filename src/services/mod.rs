//! Services module - Startup and background-coordination logic.
//!
//! These services are **UI-agnostic**: they talk to screens only through the
//! [`Screen`](crate::ui::Screen) trait and the main-thread dispatcher, which
//! keeps them testable without a windowing system.
//!
//! # Components
//!
//! - [`FilesystemBootstrapper`]: creates the working directories and re-applies their modes
//!   on every start. Per-directory failures are reported, never fatal.
//!
//! - [`OneTimeMigrator`]: runs cleanup actions guarded by durable completion flags in the
//!   [`PreferenceStore`](crate::preferences::PreferenceStore). At-least-once attempt,
//!   at-most-once effect.
//!
//! - [`ProgressAggregator`]: ORs the busy flags of every registered [`Loader`] and pushes
//!   the result to the foreground screen on the interaction thread.
//!
//! - [`platform`]: pluggable strategies for the active framework version and network access.
//!
//! # Startup Order
//!
//! 1. Open preferences
//! 2. [`FilesystemBootstrapper::ensure_directories`]
//! 3. [`OneTimeMigrator::run_all`]
//! 4. Register loaders, start delivering screen lifecycle events

pub mod bootstrap;
pub mod migration;
pub mod platform;
pub mod progress;

pub use bootstrap::{BootstrapError, BootstrapReport, DirectoryStatus, FilesystemBootstrapper};
pub use migration::{
    CleanupRoot, CleanupRoots, Migration, MigrationError, MigrationOutcome, MigrationReport,
    OneTimeMigrator, builtin_migrations, remove_if_present,
};
pub use platform::{
    AssumeGranted, Denied, FixedFrameworkVersion, FrameworkProbe, NetworkPermission,
    NoActiveFramework,
};
pub use progress::{BusyFlag, Loader, ProgressAggregator};
