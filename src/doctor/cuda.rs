//! CUDA driver, toolkit and compatibility checks

use crate::doctor::command;
use crate::probes::{ProbeContext, RawOutcome};
use serde_json::Value;
use std::cmp::Ordering;
use std::path::Path;

/// Conventional CUDA install root on Linux
pub const CUDA_ROOT: &str = "/usr/local/cuda";

/// Minimum driver per CUDA release
pub const CUDA_DRIVER_MIN: [(&str, &str); 5] = [
    ("11.8", "520.61.05"),
    ("12.1", "530.30.02"),
    ("12.2", "535.54.03"),
    ("12.3", "545.23.06"),
    ("12.4", "550.54.14"),
];

pub fn required_driver(cuda_key: &str) -> Option<&'static str> {
    CUDA_DRIVER_MIN
        .iter()
        .find(|(cuda, _)| *cuda == cuda_key)
        .map(|(_, driver)| *driver)
}

/// `Driver Version: 535.54.03` line from the default nvidia-smi banner
pub fn parse_banner_driver_version(stdout: &str) -> Option<String> {
    let (_, rest) = stdout.split_once("Driver Version:")?;
    command::extract_version(rest.split_whitespace().next()?)
}

pub fn driver_version(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let Some(smi) = command::locate("nvidia-smi") else {
        return Ok(RawOutcome::warn("Unable to detect NVIDIA driver version.")
            .with_detail("method_used", "unknown")
            .with_remediation(["Install the NVIDIA driver and make sure nvidia-smi is on PATH."]));
    };

    let query = command::run(&smi, &["--query-gpu=driver_version", "--format=csv,noheader"])?;
    let mut found = query
        .first_line()
        .filter(|_| query.success())
        .and_then(command::extract_version)
        .map(|version| (version, "query-gpu", query.clone()));

    if found.is_none() {
        let banner = command::run(&smi, &[])?;
        found = parse_banner_driver_version(&banner.stdout)
            .filter(|_| banner.success())
            .map(|version| (version, "default-output", banner));
    }

    Ok(match found {
        Some((version, source, captured)) => {
            RawOutcome::pass(format!("NVIDIA driver {} detected via nvidia-smi.", version))
                .with_detail("driver_version", version.clone())
                .with_detail("method_used", "nvidia-smi")
                .with_detail("parse_source", source)
                .with_detail("output", captured.to_details())
                .with_fact("driver_version", version)
        }
        None => RawOutcome::fail("Unable to detect NVIDIA driver version.")
            .with_detail("method_used", "nvidia-smi")
            .with_detail("output", query.to_details())
            .with_remediation(["Check that nvidia-smi runs cleanly; reinstall the driver if not."]),
    })
}

/// CUDA release from `nvcc --version` output
pub fn parse_nvcc_release(stdout: &str) -> Option<String> {
    let lower = stdout.to_ascii_lowercase();
    let index = lower.find("release ")?;
    command::extract_version(&stdout[index + "release ".len()..])
        .or_else(|| command::extract_version(stdout))
}

pub fn toolkit_nvcc(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let Some(nvcc) = command::locate("nvcc") else {
        return Ok(RawOutcome::warn("nvcc not found; runtime-only CUDA environments are common.")
            .with_detail("nvcc_found", false)
            .with_detail("nvcc_path", Value::Null)
            .with_remediation(["Install CUDA toolkit if nvcc/toolchain workflows are required."]));
    };

    let path = nvcc.display().to_string();
    let captured = command::run(&nvcc, &["--version"])?;
    let version = parse_nvcc_release(&captured.stdout).filter(|_| captured.success());

    let outcome = match &version {
        Some(version) => RawOutcome::pass(format!("nvcc reports CUDA toolkit {}.", version))
            .with_fact("nvcc_version", version.clone()),
        None => RawOutcome::warn("nvcc found but CUDA toolkit version could not be parsed.")
            .with_remediation(["Verify CUDA toolkit installation if compile-time tooling is needed."]),
    };

    Ok(outcome
        .with_detail("nvcc_found", true)
        .with_detail("nvcc_path", path)
        .with_detail("nvcc_version", serde_json::json!(version))
        .with_detail("output", captured.to_details()))
}

/// CUDA version to check the driver against: PyTorch's first, then nvcc's
pub fn detected_cuda_version(ctx: &ProbeContext) -> Option<&str> {
    ["torch_cuda_version", "nvcc_version"]
        .iter()
        .filter_map(|key| ctx.fact_str(key))
        .find(|v| !v.is_empty())
}

pub fn has_versions_to_compare(ctx: &ProbeContext) -> bool {
    ctx.fact_str("driver_version").is_some_and(|v| !v.is_empty()) && detected_cuda_version(ctx).is_some()
}

/// `12.1.105` -> `12.1`
fn cuda_key(version: &str) -> String {
    version.split('.').take(2).collect::<Vec<_>>().join(".")
}

pub fn compat_outcome(driver: &str, cuda: &str) -> RawOutcome {
    let key = cuda_key(cuda);
    let required = required_driver(&key);

    let with_details = |outcome: RawOutcome| {
        outcome
            .with_detail("detected_cuda_version", cuda)
            .with_detail("driver_version", driver)
            .with_detail("required_min_driver", serde_json::json!(required))
    };

    let Some(required) = required else {
        return with_details(
            RawOutcome::warn("CUDA version not present in built-in compatibility table.").with_remediation([
                "Verify NVIDIA's CUDA compatibility matrix for this CUDA release.",
                "Reference: https://docs.nvidia.com/deploy/cuda-compatibility/",
            ]),
        );
    };

    let outcome = match command::compare_versions(driver, required) {
        None => RawOutcome::warn("Could not compare driver and CUDA versions.")
            .with_remediation([format!("Ensure NVIDIA driver is >= {} for CUDA {}.", required, key)]),
        Some(Ordering::Less) => {
            RawOutcome::fail("NVIDIA driver is below the minimum required for detected CUDA.")
                .with_remediation([format!("Upgrade NVIDIA driver to >= {}.", required)])
        }
        Some(_) => RawOutcome::pass("Driver/CUDA compatibility check passed against built-in matrix."),
    };

    with_details(outcome)
}

pub fn driver_cuda_compat(ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let driver = ctx
        .fact_str("driver_version")
        .ok_or_else(|| anyhow::anyhow!("driver version fact missing"))?;
    let cuda = detected_cuda_version(ctx).ok_or_else(|| anyhow::anyhow!("CUDA version fact missing"))?;
    Ok(compat_outcome(driver, cuda))
}

/// Record whether the conventional CUDA root exists
pub fn runtime_hint_outcome(root: &Path) -> RawOutcome {
    RawOutcome::pass("Collected CUDA runtime path hint.")
        .with_detail("cuda_root_path", root.display().to_string())
        .with_detail("cuda_root_exists", root.exists())
}

pub fn runtime_hint(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    Ok(runtime_hint_outcome(Path::new(CUDA_ROOT)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::Status;

    #[test]
    fn test_banner_parse() {
        let banner = "| NVIDIA-SMI 535.54.03   Driver Version: 535.54.03   CUDA Version: 12.2 |";
        assert_eq!(parse_banner_driver_version(banner).as_deref(), Some("535.54.03"));
        assert_eq!(parse_banner_driver_version("nothing"), None);
    }

    #[test]
    fn test_nvcc_parse() {
        let out = "nvcc: NVIDIA (R) Cuda compiler driver\n\
                   Cuda compilation tools, release 12.2, V12.2.140\n";
        assert_eq!(parse_nvcc_release(out).as_deref(), Some("12.2"));
    }

    #[test]
    fn test_compat_pass() {
        let outcome = compat_outcome("535.54.03", "12.2");
        assert_eq!(outcome.status, Status::Pass);
        assert_eq!(outcome.details["required_min_driver"], "535.54.03");
    }

    #[test]
    fn test_compat_old_driver_fails() {
        let outcome = compat_outcome("525.60.13", "12.1.105");
        assert_eq!(outcome.status, Status::Fail);
        assert_eq!(outcome.severity, 3);
    }

    #[test]
    fn test_compat_unknown_release_warns() {
        let outcome = compat_outcome("560.28.03", "12.6");
        assert_eq!(outcome.status, Status::Warn);
        assert_eq!(outcome.details["required_min_driver"], Value::Null);
    }

    #[test]
    fn test_compat_unparseable_driver_warns() {
        assert_eq!(compat_outcome("unknown", "12.4").status, Status::Warn);
    }

    #[test]
    fn test_cuda_version_prefers_torch() {
        let ctx = ProbeContext::new()
            .with_fact("nvcc_version", "12.4")
            .with_fact("torch_cuda_version", "12.1")
            .with_fact("driver_version", "535.54.03");
        assert_eq!(detected_cuda_version(&ctx), Some("12.1"));
        assert!(has_versions_to_compare(&ctx));
        assert!(!has_versions_to_compare(&ProbeContext::new().with_fact("nvcc_version", "12.4")));
    }

    #[test]
    fn test_runtime_hint_reports_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let present = runtime_hint_outcome(dir.path());
        assert_eq!(present.status, Status::Pass);
        assert_eq!(present.details["cuda_root_exists"], true);

        let missing = runtime_hint_outcome(&dir.path().join("cuda-missing"));
        assert_eq!(missing.status, Status::Pass);
        assert_eq!(missing.details["cuda_root_exists"], false);
        assert!(missing.details["cuda_root_path"].as_str().unwrap().ends_with("cuda-missing"));
    }
}
