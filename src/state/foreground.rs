// ForegroundTracker - which screen, if any, is currently interactive
//
// Two states: NoneVisible (initial) and Visible(screen). The latest
// "became interactive" event always wins; a "stopped" event only clears the
// state when it names the screen that is actually visible, so a pause that
// arrives after another screen's resume is ignored.

use super::StateManager;
use crate::metrics::Metrics;
use crate::services::ProgressAggregator;
use crate::ui::{DispatchError, MainThreadDispatcher, ScreenHandle, ScreenId};
use std::sync::Arc;

/// Observable state of the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForegroundState {
    NoneVisible,
    Visible(ScreenId),
}

/// Result of a stop event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The visible screen stopped; its indicator was cleared and the reference released
    Cleared,
    /// A different screen is visible; the event was superseded
    IgnoredStale { visible: ScreenId },
    /// No screen was visible
    NotVisible,
}

/// Tracks the foreground screen and repaints its busy indicator on entry.
///
/// Lifecycle callbacks must be delivered on the interaction thread; a call
/// from another thread is logged. [`current`](Self::current) and
/// [`state`](Self::state) are thread-agnostic.
pub struct ForegroundTracker {
    state: StateManager,
    aggregator: Arc<ProgressAggregator>,
    dispatcher: MainThreadDispatcher,
    metrics: Arc<Metrics>,
}

impl ForegroundTracker {
    pub fn new(
        state: StateManager,
        aggregator: Arc<ProgressAggregator>,
        dispatcher: MainThreadDispatcher,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            state,
            aggregator,
            dispatcher,
            metrics,
        }
    }

    pub fn state(&self) -> ForegroundState {
        match self.current() {
            Some(id) => ForegroundState::Visible(id),
            None => ForegroundState::NoneVisible,
        }
    }

    pub fn current(&self) -> Option<ScreenId> {
        self.state.read(|s| s.foreground_id())
    }

    /// A screen was created.
    ///
    /// The first creation in the process asks every registered loader to
    /// start its initial load; later creations do nothing.
    ///
    /// # Returns
    /// `true` if this call performed the first-load trigger
    pub fn on_screen_created(&self, screen: &ScreenHandle) -> bool {
        self.check_thread("on_screen_created");

        if !self.state.mark_ui_loaded() {
            return false;
        }

        tracing::info!("First screen {} created, triggering initial loads", screen.id());
        // Outside the state lock: loaders may publish synchronously
        for loader in self.aggregator.loaders() {
            loader.trigger_first_load_if_necessary();
        }
        true
    }

    /// `screen` became the interactive screen.
    ///
    /// Replaces any previous foreground screen, then republishes the busy
    /// value so the new screen shows it immediately.
    pub fn on_screen_became_interactive(&self, screen: ScreenHandle) -> Result<bool, DispatchError> {
        self.check_thread("on_screen_became_interactive");

        let id = screen.id();
        let previous = self
            .state
            .update_with(|s| s.foreground.replace(screen).map(|old| old.id()))
            .0;

        match previous {
            Some(old) if old != id => {
                tracing::debug!("{} became interactive, superseding {}", id, old)
            }
            _ => tracing::debug!("{} became interactive", id),
        }

        let (any_busy, _) = self.aggregator.recompute_and_publish()?;
        Ok(any_busy)
    }

    /// `screen` is no longer interactive.
    ///
    /// Only acts when `screen` is the visible one: its indicator is cleared
    /// while the lock is held, then the reference is released.
    pub fn on_screen_stopped_being_interactive(&self, screen: &ScreenHandle) -> StopOutcome {
        self.check_thread("on_screen_stopped_being_interactive");

        let outcome = self
            .state
            .update_with(|s| match s.foreground_id() {
                Some(visible) if visible == screen.id() => {
                    if let Some(live) = screen.upgrade() {
                        live.set_busy_indicator_visible(false);
                    }
                    s.foreground = None;
                    StopOutcome::Cleared
                }
                Some(visible) => StopOutcome::IgnoredStale { visible },
                None => StopOutcome::NotVisible,
            })
            .0;

        match outcome {
            StopOutcome::Cleared => tracing::debug!("{} stopped being interactive", screen.id()),
            StopOutcome::IgnoredStale { visible } => {
                self.metrics.record_stale_stop();
                tracing::debug!(
                    "Ignoring stale stop for {} while {} is visible",
                    screen.id(),
                    visible
                );
            }
            StopOutcome::NotVisible => {
                self.metrics.record_stale_stop();
                tracing::debug!("Ignoring stop for {}, no screen visible", screen.id());
            }
        }

        outcome
    }

    fn check_thread(&self, callback: &str) {
        if !self.dispatcher.is_interaction_thread() {
            tracing::warn!("{} called off the interaction thread", callback);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::progress::{BusyFlag, MockLoader};
    use crate::ui::{MainLoop, Screen};
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

    impl RecordingScreen {
        fn calls(&self) -> Vec<bool> {
            self.calls.lock().unwrap().clone()
        }
    }

    struct Fixture {
        tracker: ForegroundTracker,
        aggregator: Arc<ProgressAggregator>,
        metrics: Arc<Metrics>,
        _main_loop: MainLoop,
    }

    fn fixture() -> Fixture {
        let metrics = Arc::new(Metrics::new());
        let state = StateManager::new();
        let dispatcher = MainThreadDispatcher::new(metrics.clone());
        let main_loop = dispatcher.establish().unwrap();
        let aggregator = Arc::new(ProgressAggregator::new(
            state.clone(),
            dispatcher.clone(),
            metrics.clone(),
        ));
        let tracker = ForegroundTracker::new(state, aggregator.clone(), dispatcher, metrics.clone());
        Fixture {
            tracker,
            aggregator,
            metrics,
            _main_loop: main_loop,
        }
    }

    #[test]
    fn test_initial_state() {
        let f = fixture();
        assert_eq!(f.tracker.state(), ForegroundState::NoneVisible);
    }

    #[test]
    fn test_became_interactive_wins() {
        let f = fixture();
        let a = Arc::new(RecordingScreen::default());
        let b = Arc::new(RecordingScreen::default());
        let handle_a = ScreenHandle::new(&a);
        let handle_b = ScreenHandle::new(&b);

        f.tracker.on_screen_became_interactive(handle_a.clone()).unwrap();
        f.tracker.on_screen_became_interactive(handle_b.clone()).unwrap();

        assert_eq!(f.tracker.state(), ForegroundState::Visible(handle_b.id()));
    }

    #[test]
    fn test_stale_stop_is_ignored() {
        let f = fixture();
        let a = Arc::new(RecordingScreen::default());
        let b = Arc::new(RecordingScreen::default());
        let handle_a = ScreenHandle::new(&a);
        let handle_b = ScreenHandle::new(&b);

        f.tracker.on_screen_became_interactive(handle_a.clone()).unwrap();
        f.tracker.on_screen_became_interactive(handle_b.clone()).unwrap();
        let outcome = f.tracker.on_screen_stopped_being_interactive(&handle_a);

        assert_eq!(outcome, StopOutcome::IgnoredStale { visible: handle_b.id() });
        assert_eq!(f.tracker.state(), ForegroundState::Visible(handle_b.id()));
        assert_eq!(f.metrics.stale_stops_ignored.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[test]
    fn test_stop_clears_indicator_and_reference() {
        let f = fixture();
        let flag = Arc::new(BusyFlag::new());
        flag.set(true);
        f.aggregator.register_loader("repository", flag);

        let screen = Arc::new(RecordingScreen::default());
        let handle = ScreenHandle::new(&screen);

        assert!(f.tracker.on_screen_became_interactive(handle.clone()).unwrap());
        let outcome = f.tracker.on_screen_stopped_being_interactive(&handle);

        assert_eq!(outcome, StopOutcome::Cleared);
        assert_eq!(screen.calls(), vec![true, false]);
        assert_eq!(f.tracker.state(), ForegroundState::NoneVisible);
    }

    #[test]
    fn test_stop_when_nothing_visible() {
        let f = fixture();
        let screen = Arc::new(RecordingScreen::default());
        let handle = ScreenHandle::new(&screen);

        assert_eq!(
            f.tracker.on_screen_stopped_being_interactive(&handle),
            StopOutcome::NotVisible
        );
        assert!(screen.calls().is_empty());
    }

    #[test]
    fn test_first_screen_triggers_loaders_once() {
        let f = fixture();
        let mut loader = MockLoader::new();
        loader.expect_trigger_first_load_if_necessary().times(1).return_const(());
        f.aggregator.register_loader("repository", Arc::new(loader));

        let first = Arc::new(RecordingScreen::default());
        let second = Arc::new(RecordingScreen::default());

        assert!(f.tracker.on_screen_created(&ScreenHandle::new(&first)));
        assert!(!f.tracker.on_screen_created(&ScreenHandle::new(&second)));
    }

    #[test]
    fn test_dropped_screen_is_never_called() {
        let f = fixture();
        let flag = Arc::new(BusyFlag::new());
        f.aggregator.register_loader("repository", flag.clone());

        let screen = Arc::new(RecordingScreen::default());
        let handle = ScreenHandle::new(&screen);
        f.tracker.on_screen_became_interactive(handle.clone()).unwrap();
        drop(screen);

        // Publishing to a destroyed screen is a no-op rather than a dangling call
        f.aggregator.set_loader_busy(&flag, true).unwrap();
        assert_eq!(f.tracker.on_screen_stopped_being_interactive(&handle), StopOutcome::Cleared);
        assert_eq!(f.metrics.busy_publishes.load(std::sync::atomic::Ordering::Relaxed), 1);
        assert_eq!(f.metrics.publishes_dropped.load(std::sync::atomic::Ordering::Relaxed), 1);
    }
}
