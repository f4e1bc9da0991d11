//! Doctor flow integration tests
//!
//! Exercises selection, execution, aggregation and persistence end to end
//! against synthetic registries, so no GPU or Python install is needed.

use continuum::engine::{OverallVerdict, SKIPPED_MESSAGE};
use continuum::errors::{DoctorError, EXIT_INVALID_INPUT};
use continuum::execution::{run_doctor, RunOptions};
use continuum::probes::{ProbeContext, ProbeDefinition, ProbeRegistry, RawOutcome, Selector, Status};
use continuum::report::{EnvironmentSnapshot, ReportWriter};
use std::time::Duration;
use tempfile::TempDir;

fn environment() -> EnvironmentSnapshot {
    EnvironmentSnapshot {
        timestamp_utc: String::new(),
        os: "Ubuntu 22.04".to_string(),
        kernel: "6.5.0-35-generic".to_string(),
        arch: "x86_64".to_string(),
        hostname: "train-07".to_string(),
        is_container: false,
        is_wsl: false,
        tool_version: "0.2.0".to_string(),
        logical_cpus: 64,
    }
}

fn python_ok(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    Ok(RawOutcome::pass("Python 3.11.6 meets minimum 3.10.").with_detail("version", "3.11.6"))
}

fn smi_missing(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    Ok(RawOutcome::fail("nvidia-smi not found in PATH.")
        .with_remediation(["Install the NVIDIA driver package for this distribution."]))
}

fn devices(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    Ok(RawOutcome::pass("2 GPU(s) detected.").with_fact("gpu_count", 2))
}

fn needs_smi(ctx: &ProbeContext) -> bool {
    ctx.passed("driver.nvidia_smi")
}

fn scenario_registry() -> ProbeRegistry {
    let mut registry = ProbeRegistry::new();
    registry
        .register(ProbeDefinition::check(
            "env.python_version",
            "env",
            "Python version",
            python_ok,
        ))
        .unwrap();
    registry
        .register(ProbeDefinition::check(
            "driver.nvidia_smi",
            "driver",
            "nvidia-smi",
            smi_missing,
        ))
        .unwrap();
    registry
        .register(ProbeDefinition::check("gpu.nvml_devices", "gpu", "GPU devices", devices).only_when(needs_smi))
        .unwrap();
    registry
}

fn deterministic() -> RunOptions {
    RunOptions::default().with_deterministic(true)
}

#[tokio::test]
async fn test_failed_driver_scenario() {
    let registry = scenario_registry();
    let report = run_doctor(&registry, &Selector::all(), &deterministic(), environment())
        .await
        .unwrap();

    let summary = &report.summary;
    assert_eq!(
        (summary.pass, summary.warn, summary.fail, summary.skip, summary.error),
        (1, 0, 1, 1, 0)
    );
    assert_eq!(report.overall_status, OverallVerdict::Failed);
    assert_eq!(report.exit_code(), 2);

    let results: Vec<_> = report.results().collect();
    assert_eq!(results[2].outcome.message, SKIPPED_MESSAGE);
    assert_eq!(results[2].outcome.duration_ms, 0.0);
}

#[tokio::test]
async fn test_json_shape() {
    let registry = scenario_registry();
    let report = run_doctor(&registry, &Selector::all(), &deterministic(), environment())
        .await
        .unwrap();

    let value: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
    assert_eq!(value["schema_version"], "1.0.0");
    assert_eq!(value["environment"]["timestamp_utc"], "1970-01-01T00:00:00Z");
    assert_eq!(value["overall_status"], "failed");
    assert_eq!(value["summary"]["FAIL"], 1);
    assert_eq!(value["total_duration_ms"], 0.0);
    assert!(value.get("analysis").is_none());

    let checks = value["checks"].as_array().unwrap();
    assert_eq!(checks.len(), 3);
    assert_eq!(checks[0]["id"], "env.python_version");
    assert_eq!(checks[0]["status"], "PASS");
    assert_eq!(checks[0]["started_at"], "1970-01-01T00:00:00Z");
    assert_eq!(checks[1]["remediation"][0], "Install the NVIDIA driver package for this distribution.");
}

#[tokio::test]
async fn test_crashing_probe_does_not_abort_siblings() {
    fn crashes(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
        panic!("device query segfaulted")
    }

    fn bails(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
        anyhow::bail!("unexpected output from nvcc")
    }

    let mut registry = ProbeRegistry::new();
    registry
        .register(ProbeDefinition::check("gpu.query", "gpu", "Query", crashes))
        .unwrap();
    registry
        .register(ProbeDefinition::check("cuda.toolkit_nvcc", "cuda", "nvcc", bails))
        .unwrap();
    registry
        .register(ProbeDefinition::check("env.python_version", "env", "Python", python_ok))
        .unwrap();

    let report = run_doctor(&registry, &Selector::all(), &deterministic(), environment())
        .await
        .unwrap();

    let statuses: Vec<Status> = report.results().map(|r| r.status()).collect();
    assert_eq!(statuses, vec![Status::Error, Status::Error, Status::Pass]);
    assert_eq!(report.summary.error, 2);
    assert_eq!(report.overall_status, OverallVerdict::Failed);

    let messages: Vec<&str> = report.results().map(|r| r.outcome.message.as_str()).collect();
    assert!(messages[0].contains("device query segfaulted"));
    assert!(messages[1].contains("unexpected output from nvcc"));
}

#[tokio::test]
async fn test_stuck_probe_times_out() {
    fn stuck(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
        std::thread::sleep(Duration::from_millis(1500));
        Ok(RawOutcome::pass("too late"))
    }

    let mut registry = ProbeRegistry::new();
    registry
        .register(ProbeDefinition::check("system.hang", "system", "Hang", stuck))
        .unwrap();
    registry
        .register(ProbeDefinition::check("env.python_version", "env", "Python", python_ok))
        .unwrap();

    let options = deterministic().with_timeout(Some(Duration::from_millis(100)));
    let report = run_doctor(&registry, &Selector::all(), &options, environment())
        .await
        .unwrap();

    let results: Vec<_> = report.results().collect();
    assert_eq!(results[0].status(), Status::Error);
    assert!(results[0].outcome.message.contains("timed out"));
    assert_eq!(results[1].status(), Status::Pass);
}

#[tokio::test]
async fn test_deterministic_reports_are_byte_identical() {
    let registry = scenario_registry();
    let dir = TempDir::new().unwrap();
    let writer = ReportWriter::new(dir.path());

    let mut contents = Vec::new();
    let mut paths = Vec::new();
    for _ in 0..2 {
        let report = run_doctor(&registry, &Selector::all(), &deterministic(), environment())
            .await
            .unwrap();
        let path = writer.write(&report).unwrap().unwrap();
        contents.push(std::fs::read(&path).unwrap());
        paths.push(path);
    }

    assert_ne!(paths[0], paths[1]);
    assert_eq!(contents[0], contents[1]);
    assert!(contents[0].ends_with(b"\n"));
}

#[tokio::test]
async fn test_selection_narrows_the_run() {
    let registry = scenario_registry();
    let selector = Selector::from_csv(Some("env,driver"), Some("driver.nvidia_smi"));
    let report = run_doctor(&registry, &selector, &deterministic(), environment())
        .await
        .unwrap();

    let ids: Vec<&str> = report.results().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["env.python_version"]);
    assert_eq!(report.overall_status, OverallVerdict::Healthy);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_unknown_selector_is_invalid_input() {
    let registry = scenario_registry();
    let selector = Selector::from_csv(Some("drvier"), Some("gpu.nvlm"));
    let err = run_doctor(&registry, &selector, &deterministic(), environment())
        .await
        .unwrap_err();

    match &err {
        DoctorError::UnknownSelector { tokens } => {
            assert_eq!(tokens, &vec!["drvier".to_string(), "gpu.nvlm".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), EXIT_INVALID_INPUT);
}

#[tokio::test]
async fn test_warn_only_is_degraded() {
    fn low_shm(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
        Ok(RawOutcome::warn("/dev/shm is 2.0 GiB; below 8 GiB."))
    }

    let mut registry = ProbeRegistry::new();
    registry
        .register(ProbeDefinition::check("system.dev_shm", "system", "shm", low_shm))
        .unwrap();
    registry
        .register(ProbeDefinition::check("env.python_version", "env", "Python", python_ok))
        .unwrap();

    let report = run_doctor(&registry, &Selector::all(), &deterministic(), environment())
        .await
        .unwrap();
    assert_eq!(report.overall_status, OverallVerdict::Degraded);
    assert_eq!(report.exit_code(), 1);
}
