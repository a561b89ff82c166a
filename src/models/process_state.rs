use crate::ui::{ScreenHandle, ScreenId};

/// Process-wide coordination state.
///
/// # Thread Safety
///
/// Lives behind the single lock owned by [`crate::state::StateManager`]. Every
/// read or write of the foreground screen and the aggregate busy value goes
/// through that lock; critical sections must stay short and non-blocking.
///
/// The interaction-thread identity is not stored here: it is captured once by
/// [`crate::ui::MainThreadDispatcher::establish`] and never changes.
#[derive(Clone, Debug, Default)]
pub struct ProcessState {
    /// Screen currently eligible for live updates; never an owning reference
    pub foreground: Option<ScreenHandle>,

    /// One-shot flag set when the first screen of the process is created
    pub ui_loaded: bool,

    /// Last aggregate busy value computed from the registered loaders
    pub any_busy: bool,
}

impl ProcessState {
    pub fn foreground_id(&self) -> Option<ScreenId> {
        self.foreground.as_ref().map(ScreenHandle::id)
    }

    pub fn is_foreground(&self, screen: &ScreenHandle) -> bool {
        self.foreground_id() == Some(screen.id())
    }
}
