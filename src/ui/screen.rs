// Screen collaborator and the non-owning handle the core keeps to it

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// A top-level UI unit that can show a busy indicator.
///
/// Implemented by the embedding UI. The core only calls this from the
/// interaction thread, either through [`MainThreadDispatcher`](crate::ui::MainThreadDispatcher)
/// or from a lifecycle callback, and always while holding the process state
/// lock: implementations must not call back into the core.
pub trait Screen: Send + Sync {
    fn set_busy_indicator_visible(&self, visible: bool);
}

/// Identity of a screen for the lifetime of its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScreenId(u64);

impl ScreenId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "screen#{}", self.0)
    }
}

/// Non-owning reference to a [`Screen`].
///
/// Holds a `Weak` so the core can never keep a destroyed screen alive. A
/// screen creates its handle once and passes clones of it to every lifecycle
/// callback; identity comparisons use [`ScreenId`], never the pointer.
#[derive(Clone)]
pub struct ScreenHandle {
    id: ScreenId,
    screen: Weak<dyn Screen>,
}

impl ScreenHandle {
    pub fn new<S: Screen + 'static>(screen: &Arc<S>) -> Self {
        let screen: Arc<dyn Screen> = screen.clone();
        Self {
            id: ScreenId::next(),
            screen: Arc::downgrade(&screen),
        }
    }

    pub fn id(&self) -> ScreenId {
        self.id
    }

    /// Upgrade to a strong reference if the screen is still alive.
    pub fn upgrade(&self) -> Option<Arc<dyn Screen>> {
        self.screen.upgrade()
    }

    pub fn is_alive(&self) -> bool {
        self.screen.strong_count() > 0
    }
}

impl PartialEq for ScreenHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ScreenHandle {}

impl fmt::Debug for ScreenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenHandle")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}
