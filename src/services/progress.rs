//! Busy-indicator aggregation across background loaders.
//!
//! Each loader reports whether it is currently working. The aggregator ORs
//! those flags and pushes the result to the foreground screen through the
//! main-thread dispatcher. The design is level-triggered: a value computed
//! while no screen is visible is dropped, and the next recompute (on the next
//! loader change or when a screen becomes visible) paints the current value.

use crate::metrics::Metrics;
use crate::state::StateManager;
use crate::ui::{Dispatch, DispatchError, MainThreadDispatcher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// A background loader whose busy state feeds the progress indicator.
///
/// The core reads the flag and forwards the first-load trigger; it never
/// manages the loader's own lifecycle. Both methods may be called from any
/// thread and must not block.
#[cfg_attr(test, mockall::automock)]
pub trait Loader: Send + Sync {
    fn is_busy(&self) -> bool;

    /// Called once, when the first screen of the process is created
    fn trigger_first_load_if_necessary(&self) {}
}

/// Atomic busy flag for loaders that have no state of their own to expose
#[derive(Debug, Default)]
pub struct BusyFlag {
    busy: AtomicBool,
}

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag, returning `true` if the value changed
    pub fn set(&self, busy: bool) -> bool {
        self.busy.swap(busy, Ordering::SeqCst) != busy
    }
}

impl Loader for BusyFlag {
    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

struct RegisteredLoader {
    name: String,
    loader: Arc<dyn Loader>,
}

/// Combines loader busy flags into the single indicator on the foreground screen.
///
/// Thread-agnostic: loaders call [`recompute_and_publish`](Self::recompute_and_publish)
/// from their own threads whenever their busy state changes.
pub struct ProgressAggregator {
    loaders: RwLock<Vec<RegisteredLoader>>,
    state: StateManager,
    dispatcher: MainThreadDispatcher,
    metrics: Arc<Metrics>,
}

impl ProgressAggregator {
    pub fn new(state: StateManager, dispatcher: MainThreadDispatcher, metrics: Arc<Metrics>) -> Self {
        Self {
            loaders: RwLock::new(Vec::new()),
            state,
            dispatcher,
            metrics,
        }
    }

    pub fn register_loader(&self, name: impl Into<String>, loader: Arc<dyn Loader>) {
        let name = name.into();
        tracing::debug!("Registered loader {}", name);
        self.loaders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RegisteredLoader { name, loader });
    }

    pub fn loader_count(&self) -> usize {
        self.loaders.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Snapshot of the registered loaders, so callers can invoke them without
    /// holding the registry lock.
    pub fn loaders(&self) -> Vec<Arc<dyn Loader>> {
        self.loaders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|entry| entry.loader.clone())
            .collect()
    }

    /// OR of every registered loader's busy flag
    pub fn any_busy(&self) -> bool {
        let loaders = self.loaders.read().unwrap_or_else(PoisonError::into_inner);
        loaders.iter().any(|entry| {
            let busy = entry.loader.is_busy();
            if busy {
                tracing::trace!("Loader {} is busy", entry.name);
            }
            busy
        })
    }

    /// Recompute the aggregate and push it to the foreground screen.
    ///
    /// The screen update runs on the interaction thread: inline when called
    /// from it, queued otherwise. Must not be called while holding the
    /// process state lock.
    ///
    /// # Returns
    /// The computed busy value and how the update was dispatched
    pub fn recompute_and_publish(&self) -> Result<(bool, Dispatch), DispatchError> {
        let any_busy = self.any_busy();
        let state = self.state.clone();
        let metrics = self.metrics.clone();

        let dispatch = self.dispatcher.run_on_main(move || {
            if state.publish_busy(any_busy) {
                metrics.record_busy_publish();
            } else {
                tracing::trace!("No foreground screen, dropping busy={}", any_busy);
                metrics.record_publish_dropped();
            }
        })?;

        Ok((any_busy, dispatch))
    }

    /// Update a [`BusyFlag`] loader and republish if its value changed.
    ///
    /// # Returns
    /// `None` if the flag already had that value
    pub fn set_loader_busy(
        &self,
        flag: &BusyFlag,
        busy: bool,
    ) -> Result<Option<(bool, Dispatch)>, DispatchError> {
        if !flag.set(busy) {
            return Ok(None);
        }
        self.recompute_and_publish().map(Some)
    }
}
