//! Host environment snapshot

use serde::{Deserialize, Serialize};
use std::path::Path;
use sysinfo::System;

/// Identity of the machine a report was produced on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    /// Set by the report builder from the run clock
    pub timestamp_utc: String,
    pub os: String,
    pub kernel: String,
    pub arch: String,
    pub hostname: String,
    pub is_container: bool,
    pub is_wsl: bool,
    pub tool_version: String,
    pub logical_cpus: usize,
}

impl EnvironmentSnapshot {
    /// Capture the current host; the timestamp is stamped later
    pub fn capture() -> Self {
        Self {
            timestamp_utc: String::new(),
            os: System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string()),
            kernel: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
            arch: std::env::consts::ARCH.to_string(),
            hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            is_container: is_container(),
            is_wsl: is_wsl(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            logical_cpus: num_cpus::get(),
        }
    }
}

/// Running inside Docker, Podman or a similar runtime
pub fn is_container() -> bool {
    container_markers_present(
        Path::new("/.dockerenv"),
        Path::new("/run/.containerenv"),
        Path::new("/proc/1/cgroup"),
    )
}

/// Running under Windows Subsystem for Linux
pub fn is_wsl() -> bool {
    if std::env::var_os("WSL_DISTRO_NAME").is_some() {
        return true;
    }
    std::fs::read_to_string("/proc/version")
        .map(|version| mentions_microsoft(&version))
        .unwrap_or(false)
}

pub(crate) fn container_markers_present(dockerenv: &Path, containerenv: &Path, cgroup: &Path) -> bool {
    if dockerenv.exists() || containerenv.exists() {
        return true;
    }
    std::fs::read_to_string(cgroup)
        .map(|text| {
            ["docker", "kubepods", "containerd", "libpod", "lxc"]
                .iter()
                .any(|marker| text.contains(marker))
        })
        .unwrap_or(false)
}

fn mentions_microsoft(version: &str) -> bool {
    let lower = version.to_ascii_lowercase();
    lower.contains("microsoft") || lower.contains("wsl")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_capture_fills_identity() {
        let env = EnvironmentSnapshot::capture();
        assert!(env.timestamp_utc.is_empty());
        assert!(env.logical_cpus >= 1);
        assert_eq!(env.tool_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_container_markers() {
        let dir = TempDir::new().unwrap();
        let dockerenv = dir.path().join(".dockerenv");
        let containerenv = dir.path().join(".containerenv");
        let cgroup = dir.path().join("cgroup");

        fs::write(&cgroup, "0::/user.slice\n").unwrap();
        assert!(!container_markers_present(&dockerenv, &containerenv, &cgroup));

        fs::write(&cgroup, "0::/kubepods/besteffort/pod123\n").unwrap();
        assert!(container_markers_present(&dockerenv, &containerenv, &cgroup));

        fs::write(&cgroup, "0::/\n").unwrap();
        fs::write(&dockerenv, "").unwrap();
        assert!(container_markers_present(&dockerenv, &containerenv, &cgroup));
    }

    #[test]
    fn test_wsl_version_string() {
        assert!(mentions_microsoft("Linux version 5.15.90.1-microsoft-standard-WSL2"));
        assert!(!mentions_microsoft("Linux version 6.5.0-generic"));
    }
}
