//! Pluggable platform strategies.
//!
//! The host environment can replace these at the composition root; each has
//! a documented default used when nothing else is configured.

/// Reports which version of the managed framework is active in the running
/// process, if any.
pub trait FrameworkProbe: Send + Sync {
    fn active_version(&self) -> Option<u32>;
}

/// Default probe: no framework is active.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoActiveFramework;

impl FrameworkProbe for NoActiveFramework {
    fn active_version(&self) -> Option<u32> {
        None
    }
}

/// Probe returning a version known up front (e.g. read from an installer manifest)
#[derive(Debug, Clone, Copy)]
pub struct FixedFrameworkVersion(pub u32);

impl FrameworkProbe for FixedFrameworkVersion {
    fn active_version(&self) -> Option<u32> {
        Some(self.0)
    }
}

/// Whether the process may use the network.
pub trait NetworkPermission: Send + Sync {
    fn is_granted(&self) -> bool;
}

/// Default: network access is granted.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeGranted;

impl NetworkPermission for AssumeGranted {
    fn is_granted(&self) -> bool {
        true
    }
}

/// Network access is denied
#[derive(Debug, Clone, Copy, Default)]
pub struct Denied;

impl NetworkPermission for Denied {
    fn is_granted(&self) -> bool {
        false
    }
}
