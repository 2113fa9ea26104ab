//! Best-effort lookup of the target application's install path

use crate::config::GeneralConfig;
use crate::error::InstallLookupError;
use std::path::PathBuf;

#[cfg(windows)]
const REGISTRY_KEY: &str = r"HKCU\Software\DownloadManager";
#[cfg(windows)]
const REGISTRY_VALUE: &str = "ExePath";

/// The configured `install_path` wins; otherwise the system is asked. Only
/// used for diagnostics, never for process matching.
pub fn locate_install(config: &GeneralConfig) -> Result<PathBuf, InstallLookupError> {
    if let Some(path) = &config.install_path {
        return if path.exists() {
            Ok(path.clone())
        } else {
            Err(InstallLookupError::NotFound(path.display().to_string()))
        };
    }
    system_install_path()
}

#[cfg(windows)]
fn system_install_path() -> Result<PathBuf, InstallLookupError> {
    use std::process::Command;

    let output = Command::new("reg")
        .args(["query", REGISTRY_KEY, "/v", REGISTRY_VALUE])
        .output()?;
    if !output.status.success() {
        return Err(InstallLookupError::NotFound(format!(
            "{}\\{}",
            REGISTRY_KEY, REGISTRY_VALUE
        )));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_reg_query(&stdout, REGISTRY_VALUE)
        .map(PathBuf::from)
        .ok_or_else(|| InstallLookupError::NotFound(format!("{}\\{}", REGISTRY_KEY, REGISTRY_VALUE)))
}

#[cfg(not(windows))]
fn system_install_path() -> Result<PathBuf, InstallLookupError> {
    Err(InstallLookupError::Unsupported)
}

/// Extracts the data of `value` from `reg query` output, e.g.
/// `    ExePath    REG_SZ    C:\Program Files\IDM\IDMan.exe`.
pub fn parse_reg_query(output: &str, value: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let rest = line.trim_start().strip_prefix(value)?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let (kind, data) = rest.trim_start().split_once(char::is_whitespace)?;
        if !kind.starts_with("REG_") {
            return None;
        }
        let data = data.trim();
        (!data.is_empty()).then(|| data.to_string())
    })
}
