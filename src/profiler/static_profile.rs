//! Static hardware profile
//!
//! Stable facts only: nothing here changes between two runs on the same
//! machine, so deterministic profile reports stay byte-identical.

use serde::{Deserialize, Serialize};
use sysinfo::{Disks, System};

/// Hardware inventory captured before any benchmark runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticProfile {
    pub os: String,
    pub kernel: String,
    pub arch: String,
    pub cpu_brand: String,
    pub physical_cores: Option<usize>,
    pub logical_cores: usize,
    pub total_memory_bytes: u64,
    pub gpu: GpuInventory,

    /// Disk holding the filesystem root
    pub root_storage: Option<DiskInfo>,
}

/// Accelerator backends usable from this build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuInventory {
    pub cuda_available: bool,
    pub metal_available: bool,
}

impl GpuInventory {
    pub fn detect() -> Self {
        Self {
            cuda_available: candle_core::utils::cuda_is_available(),
            metal_available: candle_core::utils::metal_is_available(),
        }
    }

    pub fn any(&self) -> bool {
        self.cuda_available || self.metal_available
    }
}

/// A mounted disk; free space is left out as volatile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskInfo {
    pub mount_point: String,
    pub file_system: String,
    pub kind: String,
    pub total_bytes: u64,
}

impl StaticProfile {
    /// Probe the current machine
    pub fn capture() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        let cpu_brand = sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        let disks = Disks::new_with_refreshed_list();
        let root_storage = root_disk(disks.iter().map(|disk| DiskInfo {
            mount_point: disk.mount_point().display().to_string(),
            file_system: disk.file_system().to_string_lossy().into_owned(),
            kind: format!("{:?}", disk.kind()),
            total_bytes: disk.total_space(),
        }));

        Self {
            os: System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string()),
            kernel: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
            arch: std::env::consts::ARCH.to_string(),
            cpu_brand,
            physical_cores: sys.physical_core_count(),
            logical_cores: num_cpus::get(),
            total_memory_bytes: sys.total_memory(),
            gpu: GpuInventory::detect(),
            root_storage,
        }
    }
}

fn is_root_mount(mount_point: &str) -> bool {
    mount_point == "/" || (mount_point.len() <= 3 && mount_point.ends_with(":\\"))
}

/// Pick the root mount, falling back to the alphabetically first one
fn root_disk(disks: impl Iterator<Item = DiskInfo>) -> Option<DiskInfo> {
    let mut disks: Vec<DiskInfo> = disks.collect();
    disks.sort_by(|a, b| a.mount_point.cmp(&b.mount_point));
    match disks.iter().position(|d| is_root_mount(&d.mount_point)) {
        Some(index) => Some(disks.swap_remove(index)),
        None => disks.into_iter().next(),
    }
}
