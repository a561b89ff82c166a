//! Composition root.
//!
//! [`AppCore`] is the explicit process context: it owns the dispatcher, the
//! state lock, the preference store and the services, and hands each of them
//! the collaborators they need at construction time. There is no static
//! accessor. Exactly one `AppCore` is built per process, by `main`, on the
//! thread that will act as the interaction thread.

use crate::metrics::Metrics;
use crate::models::CoreConfig;
use crate::preferences::{PreferenceStore, YamlPreferenceStore, keys};
use crate::services::{
    AssumeGranted, BootstrapReport, BusyFlag, CleanupRoots, FilesystemBootstrapper,
    FrameworkProbe, Loader, Migration, MigrationReport, NetworkPermission, NoActiveFramework,
    OneTimeMigrator, ProgressAggregator, builtin_migrations,
};
use crate::state::{ForegroundState, ForegroundTracker, StateChange, StateManager, StopOutcome};
use crate::ui::{Dispatch, DispatchError, MainLoop, MainThreadDispatcher, ScreenHandle};
use anyhow::{Context, Result};
use std::fs;
use std::sync::Arc;
use tokio::sync::broadcast;

/// What happened during startup
#[derive(Debug, Default)]
pub struct StartupReport {
    pub bootstrap: BootstrapReport,
    pub migrations: MigrationReport,
}

/// Builder for [`AppCore`]; every collaborator has a default.
pub struct AppCoreBuilder {
    config: CoreConfig,
    preferences: Option<Arc<dyn PreferenceStore>>,
    framework: Arc<dyn FrameworkProbe>,
    network: Arc<dyn NetworkPermission>,
    migrations: Vec<Migration>,
}

impl AppCoreBuilder {
    /// Use `store` instead of the YAML file named by the config
    pub fn preferences(mut self, store: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(store);
        self
    }

    pub fn framework_probe(mut self, probe: Arc<dyn FrameworkProbe>) -> Self {
        self.framework = probe;
        self
    }

    pub fn network_permission(mut self, permission: Arc<dyn NetworkPermission>) -> Self {
        self.network = permission;
        self
    }

    pub fn migrations(mut self, migrations: Vec<Migration>) -> Self {
        self.migrations = migrations;
        self
    }

    /// Build the core on the calling thread, which becomes the interaction thread.
    ///
    /// Establishes the dispatcher, opens preferences, bootstraps the working
    /// directories and runs pending migrations. Directory and migration
    /// failures are logged and reported; only a broken preference file or a
    /// second establishment of the dispatcher fails startup.
    ///
    /// # Returns
    /// The core and the [`MainLoop`] the caller must drive on this thread
    pub fn start(self) -> Result<(AppCore, MainLoop)> {
        let config = self.config;
        let metrics = Arc::new(Metrics::new());

        let dispatcher = MainThreadDispatcher::new(metrics.clone());
        let main_loop = dispatcher
            .establish()
            .context("Failed to establish the interaction thread")?;

        let preferences: Arc<dyn PreferenceStore> = match self.preferences {
            Some(store) => store,
            None => {
                let path = config.preferences_path();
                Arc::new(
                    YamlPreferenceStore::open(&path)
                        .with_context(|| format!("Failed to open preferences: {}", path))?,
                )
            }
        };

        if let Err(e) = fs::create_dir_all(&config.base_dir) {
            tracing::warn!("Failed to create base directory {}: {}", config.base_dir, e);
        }

        let bootstrap = FilesystemBootstrapper::new(config.base_dir.clone(), metrics.clone())
            .ensure_directories(&config.directories);

        let roots = CleanupRoots {
            base_dir: config.base_dir.clone(),
            external_storage: config.external_storage_dir.clone(),
        };
        let migrations = OneTimeMigrator::new(preferences.clone(), metrics.clone())
            .run_all(&self.migrations, &roots);

        let state = StateManager::new();
        let aggregator = Arc::new(ProgressAggregator::new(
            state.clone(),
            dispatcher.clone(),
            metrics.clone(),
        ));
        let tracker = ForegroundTracker::new(
            state.clone(),
            aggregator.clone(),
            dispatcher.clone(),
            metrics.clone(),
        );

        tracing::info!(
            "Core ready: {} directories ready, {} migrations completed",
            bootstrap.outcomes.iter().filter(|o| o.result.is_ok()).count(),
            migrations.completed.len()
        );

        let core = AppCore {
            config,
            preferences,
            dispatcher,
            state,
            aggregator,
            tracker,
            framework: self.framework,
            network: self.network,
            metrics,
            startup: StartupReport {
                bootstrap,
                migrations,
            },
        };

        Ok((core, main_loop))
    }
}

/// The process-wide coordination context.
///
/// Lifecycle callbacks (`on_screen_*`) must be delivered on the interaction
/// thread. Everything else is thread-agnostic; share the core behind an
/// `Arc` or hand loaders the [`ProgressAggregator`] from
/// [`aggregator`](Self::aggregator).
pub struct AppCore {
    config: CoreConfig,
    preferences: Arc<dyn PreferenceStore>,
    dispatcher: MainThreadDispatcher,
    state: StateManager,
    aggregator: Arc<ProgressAggregator>,
    tracker: ForegroundTracker,
    framework: Arc<dyn FrameworkProbe>,
    network: Arc<dyn NetworkPermission>,
    metrics: Arc<Metrics>,
    startup: StartupReport,
}

impl AppCore {
    pub fn builder(config: CoreConfig) -> AppCoreBuilder {
        AppCoreBuilder {
            config,
            preferences: None,
            framework: Arc::new(NoActiveFramework),
            network: Arc::new(AssumeGranted),
            migrations: builtin_migrations(),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn preferences(&self) -> &Arc<dyn PreferenceStore> {
        &self.preferences
    }

    pub fn dispatcher(&self) -> &MainThreadDispatcher {
        &self.dispatcher
    }

    pub fn aggregator(&self) -> Arc<ProgressAggregator> {
        self.aggregator.clone()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn startup_report(&self) -> &StartupReport {
        &self.startup
    }

    /// Subscribe to foreground, busy and UI-loaded changes
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state.subscribe()
    }

    pub fn register_loader(&self, name: impl Into<String>, loader: Arc<dyn Loader>) {
        self.aggregator.register_loader(name, loader);
    }

    pub fn set_loader_busy(
        &self,
        flag: &BusyFlag,
        busy: bool,
    ) -> Result<Option<(bool, Dispatch)>, DispatchError> {
        self.aggregator.set_loader_busy(flag, busy)
    }

    pub fn recompute_and_publish(&self) -> Result<(bool, Dispatch), DispatchError> {
        self.aggregator.recompute_and_publish()
    }

    pub fn on_screen_created(&self, screen: &ScreenHandle) -> bool {
        self.tracker.on_screen_created(screen)
    }

    pub fn on_screen_became_interactive(&self, screen: ScreenHandle) -> Result<bool, DispatchError> {
        self.tracker.on_screen_became_interactive(screen)
    }

    pub fn on_screen_stopped_being_interactive(&self, screen: &ScreenHandle) -> StopOutcome {
        self.tracker.on_screen_stopped_being_interactive(screen)
    }

    pub fn foreground(&self) -> ForegroundState {
        self.tracker.state()
    }

    /// Downloads need both the user toggle and network access.
    pub fn downloads_enabled(&self) -> bool {
        if !self.preferences.get_bool(keys::ENABLE_DOWNLOADS, true) {
            return false;
        }
        self.network.is_granted()
    }

    /// Framework version active in this process, per the configured probe
    pub fn active_framework_version(&self) -> Option<u32> {
        self.framework.active_version()
    }

    pub fn accent_color(&self, default: i64) -> i64 {
        self.preferences.get_int(keys::ACCENT_COLOR, default)
    }

    /// Stop a blocking [`MainLoop::run`] and log the metrics summary
    pub fn shutdown(&self) {
        if let Err(e) = self.dispatcher.shutdown() {
            tracing::warn!("Main loop already gone at shutdown: {}", e);
        }
        self.metrics.log_summary();
    }
}
