//! Single-instance guard backed by an exclusively locked file

use crate::error::InstanceError;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Held for the life of the process; the OS releases the lock when the file
/// is closed, including on abnormal exit.
#[derive(Debug)]
pub struct InstanceLock {
    _file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Acquires `name` in the per-user runtime directory.
    pub fn acquire(name: &str) -> Result<Self, InstanceError> {
        Self::acquire_in(&Self::lock_dir(), name)
    }

    pub fn acquire_in(dir: &Path, name: &str) -> Result<Self, InstanceError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.lock", name));
        let file = open_exclusive(&path).map_err(|e| {
            if is_contended(&e) {
                InstanceError::AlreadyHeld(name.to_string())
            } else {
                InstanceError::Io(e)
            }
        })?;
        Ok(Self { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "autocloser")
            .map(|dirs| {
                dirs.runtime_dir()
                    .unwrap_or_else(|| dirs.data_local_dir())
                    .to_path_buf()
            })
            .unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(unix)]
fn open_exclusive(path: &Path) -> std::io::Result<File> {
    use std::os::unix::io::AsRawFd;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    // flock locks belong to the open file description, so a second open in
    // the same process conflicts too.
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(file)
}

#[cfg(windows)]
fn open_exclusive(path: &Path) -> std::io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;

    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .share_mode(0)
        .open(path)
}

#[cfg(unix)]
fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
}

#[cfg(windows)]
fn is_contended(err: &std::io::Error) -> bool {
    const ERROR_SHARING_VIOLATION: i32 = 32;
    err.raw_os_error() == Some(ERROR_SHARING_VIOLATION)
}
