//! Error types for the OS-facing collaborators

use thiserror::Error;

/// Failures reported by a [`ProcessCollector`](crate::collector::ProcessCollector)
/// or a [`ProcessHandle`](crate::collector::ProcessHandle).
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("process {0} not found")]
    NotFound(u32),

    #[error("access denied to process {0}")]
    AccessDenied(u32),

    #[error("I/O counters unavailable for process {pid}: {reason}")]
    CountersUnavailable { pid: u32, reason: String },

    #[error("failed to terminate process {pid}: {reason}")]
    TerminateFailed { pid: u32, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CollectorError {
    /// Maps an I/O error raised while touching `pid` to the closest variant.
    pub fn from_io(pid: u32, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => CollectorError::NotFound(pid),
            std::io::ErrorKind::PermissionDenied => CollectorError::AccessDenied(pid),
            _ => CollectorError::Io(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("another instance already holds lock '{0}'")]
    AlreadyHeld(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum InstallLookupError {
    #[error("install path not found: {0}")]
    NotFound(String),

    #[error("install path lookup is not supported on this platform")]
    Unsupported,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
