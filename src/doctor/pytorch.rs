//! PyTorch installation checks
//!
//! A single interpreter call collects everything the later checks need and
//! publishes it as the `torch` fact.

use crate::doctor::command;
use crate::probes::{ProbeContext, RawOutcome};
use serde::{Deserialize, Serialize};
use serde_json::json;

const INSPECT_SCRIPT: &str = r#"
import json
try:
    import torch
except Exception as exc:
    print(json.dumps({"installed": False, "error": "%s: %s" % (type(exc).__name__, exc)}))
else:
    cuda = bool(torch.cuda.is_available())
    cudnn = None
    try:
        cudnn = torch.backends.cudnn.version()
    except Exception:
        pass
    dist = False
    nccl = False
    try:
        import torch.distributed as d
        dist = bool(d.is_available())
        nccl = bool(dist and d.is_nccl_available())
    except Exception:
        pass
    count = torch.cuda.device_count() if cuda else 0
    devices = []
    for idx in range(min(count, 8)):
        try:
            props = torch.cuda.get_device_properties(idx)
        except Exception:
            break
        devices.append({
            "index": idx,
            "name": str(getattr(props, "name", "GPU-%d" % idx)),
            "major": int(getattr(props, "major", 0)),
            "minor": int(getattr(props, "minor", 0)),
            "total_memory": int(getattr(props, "total_memory", 0)),
            "multiprocessor_count": int(getattr(props, "multi_processor_count", 0)),
        })
    print(json.dumps({
        "installed": True,
        "version": str(torch.__version__),
        "origin": getattr(torch, "__file__", None),
        "cuda_version": torch.version.cuda,
        "cuda_available": cuda,
        "device_count": count,
        "devices": devices,
        "cudnn_version": cudnn,
        "distributed_available": dist,
        "nccl_available": nccl,
    }))
"#;

/// Oldest compute capability with full mixed-precision support
pub const MIN_COMPUTE_CAPABILITY: (u32, u32) = (7, 0);

/// One CUDA device as torch sees it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorchDevice {
    pub index: u32,
    pub name: String,
    pub major: u32,
    pub minor: u32,
    #[serde(default)]
    pub total_memory: u64,
    #[serde(default)]
    pub multiprocessor_count: u32,
}

impl TorchDevice {
    pub fn compute_capability(&self) -> (u32, u32) {
        (self.major, self.minor)
    }
}

/// What the interpreter reported about torch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorchInfo {
    pub installed: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub cuda_version: Option<String>,
    #[serde(default)]
    pub cuda_available: bool,
    #[serde(default)]
    pub device_count: u64,
    #[serde(default)]
    pub devices: Vec<TorchDevice>,
    #[serde(default)]
    pub cudnn_version: Option<u64>,
    #[serde(default)]
    pub distributed_available: bool,
    #[serde(default)]
    pub nccl_available: bool,
}

impl TorchInfo {
    /// Parse the last JSON line the inspect script printed
    pub fn parse(stdout: &str) -> anyhow::Result<Self> {
        let line = stdout
            .lines()
            .rev()
            .find(|line| line.trim_start().starts_with('{'))
            .ok_or_else(|| anyhow::anyhow!("torch inspection printed no JSON"))?;
        Ok(serde_json::from_str(line)?)
    }

    /// Published `torch` fact, if any
    pub fn from_context(ctx: &ProbeContext) -> Option<Self> {
        ctx.fact("torch").and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    fn is_cpu_build(&self) -> bool {
        self.cuda_version.is_none()
            || self
                .version
                .as_deref()
                .is_some_and(|v| v.to_ascii_lowercase().contains("+cpu"))
    }
}

pub fn installed_outcome(info: &TorchInfo) -> anyhow::Result<RawOutcome> {
    let outcome = if info.installed {
        let mut outcome = RawOutcome::pass(format!(
            "PyTorch {} detected.",
            info.version.as_deref().unwrap_or("unknown")
        ))
        .with_fact("torch_installed", true)
        .with_fact("torch", serde_json::to_value(info)?);
        if let Some(version) = &info.version {
            outcome = outcome.with_fact("torch_version", version.clone());
        }
        if let Some(cuda) = &info.cuda_version {
            outcome = outcome.with_fact("torch_cuda_version", cuda.clone());
        }
        outcome
    } else {
        RawOutcome::fail("PyTorch package is not installed.")
            .with_remediation([
                "Install PyTorch: https://pytorch.org/get-started/locally/",
                "Activate the virtual environment that has PyTorch installed.",
            ])
            .with_fact("torch_installed", false)
    };

    Ok(outcome
        .with_detail("found", info.installed)
        .with_detail("origin", json!(info.origin))
        .with_detail("error", json!(info.error)))
}

pub fn installed(ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let python = ctx
        .fact_str("python_executable")
        .map(std::path::PathBuf::from)
        .or_else(command::python_interpreter);

    let Some(python) = python else {
        return installed_outcome(&TorchInfo {
            error: Some("no Python interpreter on PATH".to_string()),
            ..TorchInfo::default()
        });
    };

    let captured = command::run(&python, &["-c", INSPECT_SCRIPT])?;
    let info = TorchInfo::parse(&captured.stdout).map_err(|err| {
        anyhow::anyhow!("{} (stderr: {})", err, command::truncate(captured.stderr.trim()))
    })?;
    installed_outcome(&info)
}

pub fn cuda_available_outcome(info: &TorchInfo, gpu_count: u64) -> RawOutcome {
    let outcome = if info.cuda_available {
        RawOutcome::pass("torch.cuda.is_available() is True.")
    } else if gpu_count > 0 {
        RawOutcome::fail("GPU detected but torch.cuda.is_available() is False.").with_remediation([
            "Install a CUDA-enabled PyTorch build matching your driver/CUDA runtime.",
            "Verify CUDA_VISIBLE_DEVICES is not masking GPUs.",
        ])
    } else if info.is_cpu_build() {
        RawOutcome::warn("PyTorch appears to be CPU-only; CUDA is unavailable.")
            .with_remediation(["Install a CUDA-enabled PyTorch build if GPU acceleration is required."])
    } else {
        RawOutcome::warn("CUDA is unavailable in the current PyTorch runtime.")
            .with_remediation(["Verify driver, CUDA runtime, and PyTorch build compatibility."])
    };

    outcome
        .with_detail("torch_version", json!(info.version))
        .with_detail("torch_cuda_version", json!(info.cuda_version))
        .with_detail("cuda_available", info.cuda_available)
        .with_detail("gpu_count", gpu_count)
        .with_fact("torch_cuda_available", info.cuda_available)
}

fn torch_fact(ctx: &ProbeContext) -> anyhow::Result<TorchInfo> {
    TorchInfo::from_context(ctx).ok_or_else(|| anyhow::anyhow!("torch inspection fact missing"))
}

pub fn cuda_available(ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let info = torch_fact(ctx)?;
    Ok(cuda_available_outcome(&info, ctx.fact_u64("gpu_count").unwrap_or(0)))
}

pub fn cuda_version_outcome(info: &TorchInfo, gpu_count: u64) -> RawOutcome {
    let outcome = if info.cuda_version.is_none() && gpu_count > 0 {
        RawOutcome::warn("GPU detected but PyTorch reports no CUDA version.")
            .with_remediation(["Install a CUDA-enabled PyTorch build matching your platform."])
    } else {
        RawOutcome::pass("PyTorch CUDA version metadata collected.")
    };

    outcome
        .with_detail("torch_version", json!(info.version))
        .with_detail("torch_cuda_version", json!(info.cuda_version))
        .with_detail("cudnn_version", json!(info.cudnn_version))
        .with_detail("gpu_count", gpu_count)
}

pub fn cuda_version(ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let info = torch_fact(ctx)?;
    Ok(cuda_version_outcome(&info, ctx.fact_u64("gpu_count").unwrap_or(0)))
}

pub fn device_properties_outcome(info: &TorchInfo) -> RawOutcome {
    if !info.cuda_available {
        return RawOutcome::skip("torch.cuda is not available; skipping GPU property collection.")
            .with_detail("cuda_available", false);
    }

    let devices: Vec<_> = info
        .devices
        .iter()
        .map(|d| {
            json!({
                "index": d.index,
                "name": d.name,
                "compute_capability": format!("{}.{}", d.major, d.minor),
                "total_memory": d.total_memory,
                "multiprocessor_count": d.multiprocessor_count,
            })
        })
        .collect();
    let below: Vec<&str> = info
        .devices
        .iter()
        .filter(|d| d.compute_capability() < MIN_COMPUTE_CAPABILITY)
        .map(|d| d.name.as_str())
        .collect();

    let outcome = if below.is_empty() {
        RawOutcome::pass("Collected GPU device properties.")
    } else {
        RawOutcome::warn("Detected GPU(s) with compute capability below 7.0.")
            .with_remediation([
                "Mixed precision and tensor-core acceleration may be limited on older GPUs.",
                "Verify capabilities with: python -c \"import torch; print([torch.cuda.get_device_capability(i) for i in range(torch.cuda.device_count())])\"",
            ])
            .with_detail("below_minimum", json!(below))
    };

    outcome
        .with_detail("device_count", info.device_count)
        .with_detail("devices", devices)
}

pub fn device_properties(ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let info = torch_fact(ctx)?;
    Ok(device_properties_outcome(&info))
}
