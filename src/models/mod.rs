//! Data models for the coordination core.
//!
//! - [`ProcessState`]: the lock-guarded process state (foreground screen, one-shot UI flag, busy value)
//! - [`CoreConfig`]: base directory, preference file, working directories and logging, loaded from `appcore.yaml`
//! - [`DirectorySpec`]: a working directory and the access mode it must carry
//!
//! # Architecture Note
//!
//! - **Serializable**: config structs derive `Serialize`/`Deserialize` for YAML persistence
//! - **Cloneable**: ProcessState is wrapped by [`StateManager`](crate::state::StateManager), which
//!   clones it to detect changes
//! - **Non-owning**: ProcessState references screens only through weak handles

pub mod config;
pub mod directory;
pub mod process_state;

pub use config::{CoreConfig, LoggingConfig};
pub use directory::{DirectorySpec, default_directories};
pub use process_state::ProcessState;
