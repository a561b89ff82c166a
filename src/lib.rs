// appcore - process-wide coordination core
//
// This is the library crate containing the coordination logic: preferences,
// directory bootstrap, one-time migrations, foreground tracking, busy-state
// aggregation and main-thread dispatch.
// The binary crate (main.rs) wires them together and drives the main loop.

pub mod app;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod preferences;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use app::{AppCore, AppCoreBuilder, StartupReport};
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{CoreConfig, DirectorySpec, LoggingConfig, ProcessState};
pub use preferences::{PreferenceStore, YamlPreferenceStore};
pub use state::{ForegroundState, StateChange, StateManager, StopOutcome};
pub use ui::{MainLoop, MainThreadDispatcher, Screen, ScreenHandle};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
