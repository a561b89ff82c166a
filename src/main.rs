//! appcore - process-wide coordination core
//!
//! Headless entry point. It initializes:
//! - Configuration ([`ConfigManager`]): `appcore.yaml` plus `APPCORE_*` overrides
//! - Logging (daily rotated file + optional console output)
//! - The coordination core ([`AppCore`]): preferences, directory bootstrap, migrations
//!
//! The thread running `main` becomes the interaction thread and drives the
//! main loop until Ctrl-C. A tokio runtime hosts the signal handler and a
//! listener that logs state changes published by the core.
//!
//! # Usage
//!
//! ```text
//! appcore [CONFIG_DIR]
//! ```
//!
//! `CONFIG_DIR` defaults to `appcore`.

use anyhow::Result;
use appcore::{APP_NAME, AppCore, ConfigManager, StateChange, VERSION};
use tokio::sync::broadcast::error::RecvError;

fn main() -> Result<()> {
    let config_dir = std::env::args().nth(1).unwrap_or_else(|| "appcore".to_string());

    let config_manager = ConfigManager::new(&config_dir)?;
    let config = config_manager.load_core_config()?;

    // Held until exit so buffered log lines are flushed
    let _log_guard = appcore::logging::init_logging(&config.log_dir(), &config.logging)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("appcore-worker")
        .build()?;

    // One core per process, built on this thread
    let (core, main_loop) = AppCore::builder(config).start()?;

    let report = core.startup_report();
    tracing::info!(
        "Startup: {} directories created, {} failed; migrations {} done, {} deferred",
        report.bootstrap.created(),
        report.bootstrap.failures().count(),
        report.migrations.completed.len() + report.migrations.already_done.len(),
        report.migrations.failed.len()
    );

    let mut changes = core.subscribe();
    runtime.spawn(async move {
        loop {
            match changes.recv().await {
                Ok(StateChange::ForegroundChanged { screen }) => {
                    tracing::debug!("Foreground changed: {:?}", screen);
                }
                Ok(StateChange::BusyChanged { busy }) => {
                    tracing::debug!("Busy changed: {}", busy);
                }
                Ok(StateChange::UiLoaded) => tracing::debug!("UI loaded"),
                Err(RecvError::Lagged(n)) => tracing::warn!("State listener lagged by {}", n),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let dispatcher = core.dispatcher().clone();
    runtime.spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Interrupt received, stopping main loop"),
            Err(e) => tracing::error!("Failed to listen for interrupt: {}", e),
        }
        if let Err(e) = dispatcher.shutdown() {
            tracing::warn!("Failed to stop main loop: {}", e);
        }
    });

    // Blocks until the signal task requests shutdown
    main_loop.run();

    core.metrics().log_summary();
    drop(core);

    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    tracing::info!("Shutdown complete");
    Ok(())
}
