//! Process enumeration and handle access

use crate::error::CollectorError;
use std::fmt;

#[cfg(target_os = "linux")]
pub mod linux;
pub mod portable;

#[cfg(target_os = "linux")]
pub use linux::LinuxProcessCollector;
pub use portable::PortableProcessCollector;

/// Collector used by the daemon on the current platform.
#[cfg(target_os = "linux")]
pub type DefaultCollector = LinuxProcessCollector;
#[cfg(not(target_os = "linux"))]
pub type DefaultCollector = PortableProcessCollector;

/// One process instance. `start_time` tells a reused PID apart from the
/// original owner; it is 0 when the platform does not report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessIdentity {
    pub pid: u32,
    pub start_time: u64,
}

impl ProcessIdentity {
    pub fn new(pid: u32, start_time: u64) -> Self {
        Self { pid, start_time }
    }
}

impl fmt::Display for ProcessIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID {}", self.pid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub identity: ProcessIdentity,
    pub name: String,
}

/// Cumulative transfer counters since the process started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

/// An open process. Dropping it releases whatever the platform holds.
pub trait ProcessHandle: Send {
    fn identity(&self) -> ProcessIdentity;
    fn io_counters(&mut self) -> Result<IoCounters, CollectorError>;
    fn terminate(&mut self, exit_code: u32) -> Result<(), CollectorError>;
}

pub trait ProcessCollector: Send + Sync {
    /// Live processes in ascending PID order.
    fn list_processes(&self) -> Vec<ProcessEntry>;
    fn open(&self, identity: ProcessIdentity) -> Result<Box<dyn ProcessHandle>, CollectorError>;
}
