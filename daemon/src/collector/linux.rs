use super::{IoCounters, ProcessCollector, ProcessEntry, ProcessHandle, ProcessIdentity};
use crate::error::CollectorError;
use crate::executor::{send_signal, Signal};
use std::fs;
use std::path::{Path, PathBuf};

/// Kernel truncates `comm` to this many bytes.
const COMM_LEN: usize = 15;

/// Reads process state from `/proc`.
pub struct LinuxProcessCollector {
    proc_root: PathBuf,
}

impl LinuxProcessCollector {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Reads from an alternate procfs mount.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { proc_root: root.into() }
    }

    fn parse_process(&self, pid: u32) -> Option<ProcessEntry> {
        let proc_dir = self.proc_root.join(pid.to_string());
        let (comm, start_time) = read_stat(&proc_dir).ok()?;
        let name = if comm.len() >= COMM_LEN {
            full_name(&proc_dir).unwrap_or(comm)
        } else {
            comm
        };
        Some(ProcessEntry {
            identity: ProcessIdentity::new(pid, start_time),
            name,
        })
    }
}

impl Default for LinuxProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessCollector for LinuxProcessCollector {
    fn list_processes(&self) -> Vec<ProcessEntry> {
        let mut processes = Vec::new();
        if let Ok(entries) = fs::read_dir(&self.proc_root) {
            for entry in entries.flatten() {
                if let Some(name) = entry.file_name().to_str() {
                    if let Ok(pid) = name.parse::<u32>() {
                        if let Some(info) = self.parse_process(pid) {
                            processes.push(info);
                        }
                    }
                }
            }
        }
        processes.sort_by_key(|p| p.identity.pid);
        processes
    }

    fn open(&self, identity: ProcessIdentity) -> Result<Box<dyn ProcessHandle>, CollectorError> {
        let handle = LinuxProcessHandle {
            identity,
            proc_dir: self.proc_root.join(identity.pid.to_string()),
        };
        handle.verify()?;
        // /proc/<pid>/io needs the same access as ptrace-read; fail here
        // rather than on the first tick.
        read_io(&handle.proc_dir).map_err(|e| CollectorError::from_io(identity.pid, e))?;
        Ok(Box::new(handle))
    }
}

/// Linux has no process handle object; the handle pins the identity and
/// rejects a PID that has since been reused.
pub struct LinuxProcessHandle {
    identity: ProcessIdentity,
    proc_dir: PathBuf,
}

impl LinuxProcessHandle {
    fn verify(&self) -> Result<(), CollectorError> {
        let pid = self.identity.pid;
        let (_, start_time) = read_stat(&self.proc_dir).map_err(|e| CollectorError::from_io(pid, e))?;
        if start_time != self.identity.start_time {
            return Err(CollectorError::NotFound(pid));
        }
        Ok(())
    }
}

impl ProcessHandle for LinuxProcessHandle {
    fn identity(&self) -> ProcessIdentity {
        self.identity
    }

    fn io_counters(&mut self) -> Result<IoCounters, CollectorError> {
        self.verify()?;
        read_io(&self.proc_dir).map_err(|e| CollectorError::CountersUnavailable {
            pid: self.identity.pid,
            reason: e.to_string(),
        })
    }

    /// `exit_code` cannot be chosen for a signalled process and is ignored.
    fn terminate(&mut self, _exit_code: u32) -> Result<(), CollectorError> {
        self.verify()?;
        send_signal(self.identity.pid, Signal::Kill).map_err(|e| CollectorError::TerminateFailed {
            pid: self.identity.pid,
            reason: e.to_string(),
        })
    }
}

/// Returns `(comm, starttime)` from `<proc_dir>/stat`.
fn read_stat(proc_dir: &Path) -> std::io::Result<(String, u64)> {
    let content = fs::read_to_string(proc_dir.join("stat"))?;
    parse_stat(&content).ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, "malformed stat line")
    })
}

fn parse_stat(content: &str) -> Option<(String, u64)> {
    // comm may itself contain spaces and parentheses
    let open = content.find('(')?;
    let close = content.rfind(')')?;
    let comm = content.get(open + 1..close)?.to_string();
    let rest: Vec<&str> = content.get(close + 1..)?.split_whitespace().collect();
    // rest[0] is field 3 (state); starttime is field 22
    let start_time = rest.get(19)?.parse().ok()?;
    Some((comm, start_time))
}

fn full_name(proc_dir: &Path) -> Option<String> {
    let cmdline = fs::read(proc_dir.join("cmdline")).ok()?;
    let argv0 = cmdline.split(|b| *b == 0).next()?;
    let argv0 = String::from_utf8_lossy(argv0);
    // Wine and similar launchers keep Windows-style paths in argv[0]
    let base = argv0.rsplit(['/', '\\']).next()?;
    (!base.is_empty()).then(|| base.to_string())
}

/// `rchar`/`wchar` count every byte moved through read/write syscalls,
/// sockets included, which is what a download shows up as.
fn read_io(proc_dir: &Path) -> std::io::Result<IoCounters> {
    let content = fs::read_to_string(proc_dir.join("io"))?;
    let mut counters = IoCounters::default();
    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let value = value.trim().parse().unwrap_or(0);
            match key.trim() {
                "rchar" => counters.read_bytes = value,
                "wchar" => counters.write_bytes = value,
                _ => {}
            }
        }
    }
    Ok(counters)
}
