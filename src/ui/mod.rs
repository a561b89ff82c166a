// UI module - thread confinement and the screen collaborator
//
// This module contains:
// - MainThreadDispatcher / MainLoop: marshal work onto the interaction thread
// - Screen / ScreenHandle: the UI unit the core updates, referenced weakly

pub mod dispatcher;
pub mod screen;

pub use dispatcher::{Dispatch, DispatchError, MainLoop, MainThreadDispatcher};
pub use screen::{Screen, ScreenHandle, ScreenId};
