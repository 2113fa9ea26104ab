//! Process termination

use crate::collector::ProcessHandle;
use crate::error::CollectorError;
use tracing::{error, info};

/// Exit code requested for a terminated target.
pub const TERMINATE_EXIT_CODE: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Term,
    Kill,
}

/// Sends `signal` to `pid`.
#[cfg(unix)]
pub fn send_signal(pid: u32, signal: Signal) -> std::io::Result<()> {
    let sig = match signal {
        Signal::Term => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "pid out of range"))?;
    let result = unsafe { libc::kill(pid, sig) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

/// Terminates the process behind `handle`, logging the outcome. The caller
/// still owns the handle and releases it by dropping.
pub fn terminate(handle: &mut dyn ProcessHandle) -> Result<(), CollectorError> {
    let identity = handle.identity();
    match handle.terminate(TERMINATE_EXIT_CODE) {
        Ok(()) => {
            info!(pid = identity.pid, "Target terminated");
            Ok(())
        }
        Err(e) => {
            error!(pid = identity.pid, "Failed to terminate target: {}", e);
            Err(e)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn send_signal_kills_child() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        send_signal(child.id(), Signal::Kill).unwrap();
        let status = child.wait().unwrap();
        assert!(!status.success());
    }

    #[test]
    fn send_signal_reports_missing_pid() {
        // PIDs never reach this value on Linux (pid_max <= 2^22)
        assert!(send_signal(999_999_999, Signal::Term).is_err());
    }
}
