//! NVIDIA driver and device checks
//!
//! Device queries go through `nvidia-smi --query-gpu`, so these checks need
//! nothing beyond the driver's own tooling.

use crate::doctor::command::{self, Captured};
use crate::probes::{ProbeContext, RawOutcome};
use serde_json::{json, Value};
use std::path::PathBuf;

/// Most device names kept in details
const MAX_LISTED_GPUS: usize = 8;

/// NVML clock throttle reason bits; idle is reported but never warned on
pub const THROTTLE_REASONS: [(u64, &str); 8] = [
    (0x1, "gpu_idle"),
    (0x2, "applications_clocks_setting"),
    (0x4, "sw_power_cap"),
    (0x8, "hw_slowdown"),
    (0x10, "sync_boost"),
    (0x20, "sw_thermal_slowdown"),
    (0x40, "hw_thermal_slowdown"),
    (0x80, "hw_power_brake_slowdown"),
];

fn nvidia_smi() -> Option<PathBuf> {
    command::locate("nvidia-smi")
}

fn query_gpu(field: &str) -> anyhow::Result<Captured> {
    let smi = nvidia_smi().ok_or_else(|| anyhow::anyhow!("nvidia-smi not found on PATH"))?;
    let query = format!("--query-gpu={}", field);
    Ok(command::run(&smi, &[query.as_str(), "--format=csv,noheader"])?)
}

pub fn nvidia_smi_check(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let Some(smi) = nvidia_smi() else {
        return Ok(RawOutcome::fail("nvidia-smi command not found.")
            .with_detail("path", Value::Null)
            .with_remediation([
                "Install the NVIDIA driver for your GPU.",
                "In containers, run with the NVIDIA container toolkit (--gpus all).",
            ])
            .with_fact("nvidia_smi_ok", false));
    };

    let path = smi.display().to_string();
    let captured = match command::run(&smi, &["-L"]) {
        Ok(captured) => captured,
        Err(err) => {
            return Ok(RawOutcome::fail("Failed to execute nvidia-smi.")
                .with_detail("path", path)
                .with_detail("error", command::truncate(&err.to_string()))
                .with_remediation(["Reinstall or repair the NVIDIA driver."])
                .with_fact("nvidia_smi_ok", false));
        }
    };

    let outcome = if captured.success() {
        RawOutcome::pass("nvidia-smi detected and operational.").with_fact("nvidia_smi_ok", true)
    } else {
        RawOutcome::fail("nvidia-smi returned a non-zero exit code.")
            .with_remediation([
                "Check that the NVIDIA kernel module is loaded (lsmod | grep nvidia).",
                "Reboot after a driver upgrade.",
            ])
            .with_fact("nvidia_smi_ok", false)
    };

    Ok(outcome.with_detail("path", path).with_detail("output", captured.to_details()))
}

/// Grade a list of device names
pub fn devices_outcome(names: &[&str]) -> RawOutcome {
    let count = names.len();
    let listed: Vec<&str> = names.iter().take(MAX_LISTED_GPUS).copied().collect();

    if count == 0 {
        return RawOutcome::fail("nvidia-smi reported no GPU devices.")
            .with_detail("gpu_count", 0)
            .with_remediation(["Verify the GPUs are visible to this host or container."])
            .with_fact("gpu_count", 0);
    }

    RawOutcome::pass(format!("Detected {} GPU device(s).", count))
        .with_detail("gpu_count", count as u64)
        .with_detail("gpu_names", json!(listed))
        .with_fact("gpu_count", count as u64)
        .with_fact("gpu_names", json!(listed))
}

pub fn nvml_devices(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let captured = query_gpu("name")?;
    if !captured.success() {
        anyhow::bail!("device query failed: {}", command::truncate(captured.stderr.trim()));
    }
    Ok(devices_outcome(&captured.lines()))
}

/// Grade per-GPU persistence mode strings (`Enabled` / `Disabled`)
pub fn persistence_outcome(modes: &[&str]) -> RawOutcome {
    let disabled: Vec<usize> = modes
        .iter()
        .enumerate()
        .filter(|(_, mode)| !mode.eq_ignore_ascii_case("enabled"))
        .map(|(index, _)| index)
        .collect();

    let outcome = if disabled.is_empty() {
        RawOutcome::pass("Persistence mode is enabled on detected GPUs.")
    } else {
        RawOutcome::warn("Persistence mode is disabled on one or more GPUs.")
            .with_remediation(["Enable persistence mode: sudo nvidia-smi -pm 1"])
    };

    outcome
        .with_detail("modes", json!(modes))
        .with_detail("disabled_indices", json!(disabled))
}

pub fn persistence_mode(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let captured = query_gpu("persistence_mode")?;
    if !captured.success() {
        return Ok(RawOutcome::warn("Could not read GPU persistence mode.")
            .with_detail("output", captured.to_details()));
    }
    Ok(persistence_outcome(&captured.lines()))
}

/// Names of the throttle reasons set in `flags`
pub fn decode_throttle_reasons(flags: u64) -> Vec<&'static str> {
    THROTTLE_REASONS
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, name)| *name)
        .collect()
}

fn parse_hex(text: &str) -> Option<u64> {
    let digits = text.trim().trim_start_matches("0x").trim_start_matches("0X");
    u64::from_str_radix(digits, 16).ok()
}

/// Grade per-GPU active throttle bitmasks as printed by nvidia-smi
pub fn throttle_outcome(raw: &[&str]) -> RawOutcome {
    let mut throttled = false;
    let mut per_gpu = Vec::new();

    for (index, text) in raw.iter().enumerate() {
        let flags = parse_hex(text);
        let reasons = flags.map(decode_throttle_reasons).unwrap_or_default();
        if reasons.iter().any(|r| *r != "gpu_idle") {
            throttled = true;
        }
        per_gpu.push(json!({ "index": index, "flags_raw": text, "reasons": reasons }));
    }

    let outcome = if throttled {
        RawOutcome::warn("One or more GPUs are currently clock-throttled.").with_remediation([
            "Check cooling and power delivery; inspect with nvidia-smi -q -d PERFORMANCE.",
            "Remove application clock or power caps if they were set deliberately low.",
        ])
    } else {
        RawOutcome::pass("No active GPU clock throttling reasons detected.")
    };

    outcome.with_detail("gpus", Value::Array(per_gpu))
}

pub fn clock_throttle_reasons(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let captured = query_gpu("clocks_throttle_reasons.active")?;
    if !captured.success() {
        return Ok(RawOutcome::warn("Could not read GPU throttle reasons.")
            .with_detail("output", captured.to_details()));
    }
    Ok(throttle_outcome(&captured.lines()))
}

fn nvidia_device_nodes() -> Vec<String> {
    let mut nodes: Vec<String> = std::fs::read_dir("/dev")
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|entry| entry.file_name().to_string_lossy().starts_with("nvidia"))
                .map(|entry| entry.path().display().to_string())
                .collect()
        })
        .unwrap_or_default();
    nodes.sort();
    nodes.truncate(16);
    nodes
}

pub fn gpu_passthrough(ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let nodes = nvidia_device_nodes();
    let smi_ok = ctx.fact_bool("nvidia_smi_ok");

    let outcome = if !nodes.is_empty() || smi_ok {
        RawOutcome::pass("Container has visible GPU devices.")
    } else {
        RawOutcome::fail("Container detected but GPU devices are not visible.").with_remediation([
            "Run the container with --gpus all (Docker) or the NVIDIA device plugin (Kubernetes).",
            "Install and configure the NVIDIA container toolkit on the host.",
        ])
    };

    Ok(outcome
        .with_detail("device_nodes", json!(nodes))
        .with_detail("nvidia_smi_ok", smi_ok))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::Status;

    #[test]
    fn test_devices_outcome() {
        let outcome = devices_outcome(&["NVIDIA A100-SXM4-80GB", "NVIDIA A100-SXM4-80GB"]);
        assert_eq!(outcome.status, Status::Pass);
        assert_eq!(outcome.facts["gpu_count"], 2);
        assert_eq!(outcome.details["gpu_names"].as_array().map(Vec::len), Some(2));

        let none = devices_outcome(&[]);
        assert_eq!(none.status, Status::Fail);
        assert_eq!(none.facts["gpu_count"], 0);
    }

    #[test]
    fn test_persistence_outcome() {
        assert_eq!(persistence_outcome(&["Enabled", "Enabled"]).status, Status::Pass);
        let mixed = persistence_outcome(&["Enabled", "Disabled"]);
        assert_eq!(mixed.status, Status::Warn);
        assert_eq!(mixed.details["disabled_indices"], json!([1]));
    }

    #[test]
    fn test_decode_throttle_reasons() {
        assert!(decode_throttle_reasons(0).is_empty());
        assert_eq!(decode_throttle_reasons(0x44), vec!["sw_power_cap", "hw_thermal_slowdown"]);
    }

    #[test]
    fn test_idle_is_not_throttling() {
        let idle = throttle_outcome(&["0x0000000000000001"]);
        assert_eq!(idle.status, Status::Pass);

        let thermal = throttle_outcome(&["0x0000000000000001", "0x0000000000000020"]);
        assert_eq!(thermal.status, Status::Warn);
        assert_eq!(thermal.details["gpus"][1]["reasons"], json!(["sw_thermal_slowdown"]));
    }

    #[test]
    fn test_unparseable_flags_ignored() {
        let outcome = throttle_outcome(&["[N/A]"]);
        assert_eq!(outcome.status, Status::Pass);
    }
}
