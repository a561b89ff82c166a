// State management module
//
// This module provides the StateManager which guards ProcessState behind the one
// lock shared by the foreground tracker and the progress aggregator, and emits
// change events for observers.

pub mod foreground;

pub use foreground::{ForegroundState, ForegroundTracker, StopOutcome};

use crate::models::ProcessState;
use crate::ui::ScreenId;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when process state is modified
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateChange {
    /// The foreground screen changed (`None` when no screen is visible)
    ForegroundChanged { screen: Option<ScreenId> },

    /// The aggregate busy value changed
    BusyChanged { busy: bool },

    /// The first screen of the process was created
    UiLoaded,
}

/// Thread-safe owner of [`ProcessState`] with event emission
///
/// This is the single mutual-exclusion boundary of the core:
/// - Provides thread-safe access to [`ProcessState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Supports subscribing to state changes via tokio broadcast channels
///
/// Closures passed to [`read`](Self::read) and [`update`](Self::update) run
/// with the lock held. They must be short and must not re-enter the core.
///
/// # Related Types
///
/// - [`ForegroundTracker`]: screen lifecycle transitions
/// - [`crate::services::ProgressAggregator`]: busy indicator publication
pub struct StateManager {
    state: Arc<RwLock<ProcessState>>,

    /// Multiple subscribers can listen for state changes
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with no foreground screen
    ///
    /// # Returns
    /// A new StateManager with a broadcast channel buffer of 100 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(ProcessState::default())),
            state_tx,
        }
    }

    /// Get a snapshot of the current state
    pub fn snapshot(&self) -> ProcessState {
        self.read(ProcessState::clone)
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let visible = state_manager.read(|state| state.foreground_id());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ProcessState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// # Returns
    /// A vector of StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut ProcessState),
    {
        self.update_with(update_fn).1
    }

    /// Like [`update`](Self::update), also returning the closure's result
    pub fn update_with<F, R>(&self, update_fn: F) -> (R, Vec<StateChange>)
    where
        F: FnOnce(&mut ProcessState) -> R,
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_state = state.clone();

        let result = update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);

        for change in &changes {
            // Ignore send errors - it's OK if no one is listening
            let _ = self.state_tx.send(change.clone());
        }

        (result, changes)
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(old: &ProcessState, new: &ProcessState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.foreground_id() != new.foreground_id() {
            changes.push(StateChange::ForegroundChanged {
                screen: new.foreground_id(),
            });
        }

        if old.any_busy != new.any_busy {
            changes.push(StateChange::BusyChanged { busy: new.any_busy });
        }

        if !old.ui_loaded && new.ui_loaded {
            changes.push(StateChange::UiLoaded);
        }

        changes
    }

    /// Flip the one-shot UI flag.
    ///
    /// Returns `true` only for the first caller in the process.
    pub fn mark_ui_loaded(&self) -> bool {
        self.update_with(|state| !std::mem::replace(&mut state.ui_loaded, true))
            .0
    }

    /// Record `any_busy` and push it to the foreground screen, if any.
    ///
    /// Runs the screen call under the lock so a concurrent stop event cannot
    /// interleave. Must be called on the interaction thread.
    ///
    /// # Returns
    /// `true` if a live foreground screen received the value
    pub fn publish_busy(&self, any_busy: bool) -> bool {
        self.update_with(|state| {
            state.any_busy = any_busy;
            match state.foreground.as_ref().and_then(|handle| handle.upgrade()) {
                Some(screen) => {
                    screen.set_busy_indicator_visible(any_busy);
                    true
                }
                None => false,
            }
        })
        .0
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

// Make StateManager cloneable for sharing across threads
impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::{Screen, ScreenHandle};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingScreen {
        calls: Mutex<Vec<bool>>,
    }

    impl Screen for RecordingScreen {
        fn set_busy_indicator_visible(&self, visible: bool) {
            self.calls.lock().unwrap().push(visible);
        }
    }

    #[test]
    fn test_new_state_manager() {
        let manager = StateManager::new();
        let state = manager.snapshot();

        assert!(state.foreground.is_none());
        assert!(!state.ui_loaded);
        assert!(!state.any_busy);
    }

    #[test]
    fn test_foreground_change_detection() {
        let manager = StateManager::new();
        let screen = Arc::new(RecordingScreen::default());
        let handle = ScreenHandle::new(&screen);

        let changes = manager.update(|state| state.foreground = Some(handle.clone()));
        assert_eq!(
            changes,
            vec![StateChange::ForegroundChanged {
                screen: Some(handle.id())
            }]
        );

        // Same screen again is not a change
        let changes = manager.update(|state| state.foreground = Some(handle.clone()));
        assert!(changes.is_empty());
    }

    #[test]
    fn test_mark_ui_loaded_once() {
        let manager = StateManager::new();

        assert!(manager.mark_ui_loaded());
        assert!(!manager.mark_ui_loaded());
        assert!(manager.read(|state| state.ui_loaded));
    }

    #[test]
    fn test_publish_busy_without_foreground() {
        let manager = StateManager::new();

        assert!(!manager.publish_busy(true));
        assert!(manager.read(|state| state.any_busy));
    }

    #[test]
    fn test_publish_busy_to_foreground() {
        let manager = StateManager::new();
        let screen = Arc::new(RecordingScreen::default());
        let handle = ScreenHandle::new(&screen);
        manager.update(|state| state.foreground = Some(handle));

        assert!(manager.publish_busy(true));
        assert!(manager.publish_busy(false));
        assert_eq!(*screen.calls.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_publish_busy_to_dropped_screen() {
        let manager = StateManager::new();
        let screen = Arc::new(RecordingScreen::default());
        let handle = ScreenHandle::new(&screen);
        manager.update(|state| state.foreground = Some(handle));

        drop(screen);
        assert!(!manager.publish_busy(true));
    }

    #[test]
    fn test_subscribe_to_changes() {
        let manager = StateManager::new();
        let mut rx = manager.subscribe();

        manager.publish_busy(true);

        let event = tokio_test::block_on(rx.recv()).unwrap();
        assert_eq!(event, StateChange::BusyChanged { busy: true });
    }

    #[test]
    fn test_clone_state_manager() {
        let manager1 = StateManager::new();
        let manager2 = manager1.clone();

        manager1.update(|state| state.any_busy = true);

        assert!(manager2.snapshot().any_busy);
    }
}
