//! Host resource checks

use crate::doctor::command;
use crate::probes::{ProbeContext, RawOutcome};
use std::path::{Path, PathBuf};
use sysinfo::{Disks, System};

const GIB: u64 = 1024 * 1024 * 1024;

const SHM_REMEDIATION: [&str; 2] = [
    "Increase shared memory size (example: docker run --shm-size=8g ...).",
    "Use tmpfs mount for /dev/shm when needed.",
];

/// Total size in KiB from `df -Pk` output
pub fn parse_df_total_kib(stdout: &str) -> Option<u64> {
    stdout
        .lines()
        .nth(1)?
        .split_whitespace()
        .nth(1)?
        .parse()
        .ok()
}

/// Grade a `/dev/shm` size
pub fn shm_outcome(total_bytes: u64) -> RawOutcome {
    let total_gib = (total_bytes as f64 / GIB as f64 * 1000.0).round() / 1000.0;

    let outcome = if total_bytes < GIB {
        RawOutcome::fail("/dev/shm is below 1 GiB.").with_remediation(SHM_REMEDIATION)
    } else if total_bytes < 8 * GIB {
        RawOutcome::warn("/dev/shm is below recommended 8 GiB.").with_remediation(SHM_REMEDIATION)
    } else {
        RawOutcome::pass("/dev/shm size is within recommended range.")
    };

    outcome
        .with_detail("total_bytes", total_bytes)
        .with_detail("total_gib", total_gib)
}

pub fn dev_shm(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let unreadable = |error: String| {
        RawOutcome::fail("Unable to read /dev/shm capacity.")
            .with_detail("error", command::truncate(&error))
            .with_remediation([
                "Ensure /dev/shm is mounted and accessible.",
                "In containers, set --shm-size=8g or mount tmpfs for /dev/shm.",
            ])
    };

    let Some(df) = command::locate("df") else {
        return Ok(unreadable("df not found on PATH".to_string()));
    };

    let captured = match command::run(&df, &["-Pk", "/dev/shm"]) {
        Ok(captured) => captured,
        Err(err) => return Ok(unreadable(err.to_string())),
    };

    match parse_df_total_kib(&captured.stdout).filter(|_| captured.success()) {
        Some(kib) => Ok(shm_outcome(kib * 1024)),
        None => Ok(unreadable(captured.stderr)),
    }
}

/// Grade available memory
pub fn memory_outcome(total_bytes: u64, available_bytes: u64) -> RawOutcome {
    let available_gib = available_bytes as f64 / GIB as f64;

    let outcome = if available_bytes < GIB {
        RawOutcome::fail(format!("Less than 1 GiB RAM available ({:.2} GiB)", available_gib))
            .with_remediation(["Close memory-heavy processes or add RAM before training."])
    } else if available_bytes < 2 * GIB {
        RawOutcome::warn(format!("Low memory ({:.2} GiB available)", available_gib))
            .with_remediation(["Reduce batch size or DataLoader worker count."])
    } else {
        RawOutcome::pass(format!("{:.2} GiB RAM available", available_gib))
    };

    outcome
        .with_detail("total_bytes", total_bytes)
        .with_detail("available_bytes", available_bytes)
}

pub fn memory(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let mut sys = System::new();
    sys.refresh_memory();
    Ok(memory_outcome(sys.total_memory(), sys.available_memory()))
}

/// Grade free space on the working directory's filesystem
pub fn disk_space_outcome(mount_point: &Path, available_bytes: u64, total_bytes: u64) -> RawOutcome {
    let available_gib = available_bytes as f64 / GIB as f64;

    let outcome = if available_bytes < GIB {
        RawOutcome::fail(format!("Less than 1 GiB free ({:.2} GiB)", available_gib))
            .with_remediation(["Free disk space; checkpoints and datasets need headroom."])
    } else if available_bytes < 5 * GIB {
        RawOutcome::warn(format!("Low disk space ({:.2} GiB free)", available_gib))
            .with_remediation(["Free disk space or point checkpoints at a larger volume."])
    } else {
        RawOutcome::pass(format!("{:.2} GiB free", available_gib))
    };

    outcome
        .with_detail("mount_point", mount_point.display().to_string())
        .with_detail("available_bytes", available_bytes)
        .with_detail("total_bytes", total_bytes)
}

pub fn disk_space(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let disks = Disks::new_with_refreshed_list();

    // Deepest mount point containing the working directory
    let disk = disks
        .iter()
        .filter(|disk| cwd.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len());

    Ok(match disk {
        Some(disk) => disk_space_outcome(disk.mount_point(), disk.available_space(), disk.total_space()),
        None => RawOutcome::warn("Could not determine disk space")
            .with_detail("working_dir", cwd.display().to_string()),
    })
}
