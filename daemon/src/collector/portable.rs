use super::{IoCounters, ProcessCollector, ProcessEntry, ProcessHandle, ProcessIdentity};
use crate::error::CollectorError;
use std::sync::Mutex;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Collector backed by `sysinfo`. On Windows the disk usage it reports comes
/// from the process's read/write transfer counters.
pub struct PortableProcessCollector {
    system: Mutex<System>,
}

impl PortableProcessCollector {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for PortableProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessCollector for PortableProcessCollector {
    fn list_processes(&self) -> Vec<ProcessEntry> {
        let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
        system.refresh_processes_specifics(ProcessesToUpdate::All, true, ProcessRefreshKind::nothing());

        let mut processes: Vec<ProcessEntry> = system
            .processes()
            .values()
            .filter(|p| p.thread_kind().is_none())
            .map(|p| ProcessEntry {
                identity: ProcessIdentity::new(p.pid().as_u32(), p.start_time()),
                name: p.name().to_string_lossy().into_owned(),
            })
            .collect();
        processes.sort_by_key(|p| p.identity.pid);
        processes
    }

    fn open(&self, identity: ProcessIdentity) -> Result<Box<dyn ProcessHandle>, CollectorError> {
        let mut handle = PortableProcessHandle {
            identity,
            pid: Pid::from_u32(identity.pid),
            system: System::new(),
        };
        handle.refresh()?;
        Ok(Box::new(handle))
    }
}

/// Keeps a private `System` that only ever refreshes the tracked PID.
pub struct PortableProcessHandle {
    identity: ProcessIdentity,
    pid: Pid,
    system: System,
}

impl PortableProcessHandle {
    fn refresh(&mut self) -> Result<&sysinfo::Process, CollectorError> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing().with_disk_usage(),
        );
        let process = self
            .system
            .process(self.pid)
            .ok_or(CollectorError::NotFound(self.identity.pid))?;
        if process.start_time() != self.identity.start_time {
            return Err(CollectorError::NotFound(self.identity.pid));
        }
        Ok(process)
    }
}

impl ProcessHandle for PortableProcessHandle {
    fn identity(&self) -> ProcessIdentity {
        self.identity
    }

    fn io_counters(&mut self) -> Result<IoCounters, CollectorError> {
        let usage = self.refresh()?.disk_usage();
        Ok(IoCounters {
            read_bytes: usage.total_read_bytes,
            write_bytes: usage.total_written_bytes,
        })
    }

    fn terminate(&mut self, _exit_code: u32) -> Result<(), CollectorError> {
        let pid = self.identity.pid;
        if self.refresh()?.kill() {
            Ok(())
        } else {
            Err(CollectorError::TerminateFailed {
                pid,
                reason: "kill request was rejected".to_string(),
            })
        }
    }
}
