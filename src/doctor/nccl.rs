//! NCCL configuration checks

use crate::doctor::pytorch::TorchInfo;
use crate::probes::{ProbeContext, RawOutcome};
use serde_json::json;

/// NCCL overrides read from the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NcclEnv {
    pub p2p_disable: Option<String>,
    pub ib_disable: Option<String>,
    pub socket_ifname: Option<String>,
}

impl NcclEnv {
    pub fn from_env() -> Self {
        Self {
            p2p_disable: std::env::var("NCCL_P2P_DISABLE").ok(),
            ib_disable: std::env::var("NCCL_IB_DISABLE").ok(),
            socket_ifname: std::env::var("NCCL_SOCKET_IFNAME").ok(),
        }
    }
}

fn truthy(value: &Option<String>) -> bool {
    value
        .as_deref()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Only worth checking on multi-GPU hosts or in containers
pub fn env_config_applies(ctx: &ProbeContext) -> bool {
    cfg!(target_os = "linux") && (ctx.fact_u64("gpu_count").unwrap_or(0) > 1 || ctx.is_container)
}

pub fn env_config_outcome(env: &NcclEnv, gpu_count: u64, is_container: bool) -> RawOutcome {
    let multi_gpu = gpu_count > 1;
    let mut suspicious = Vec::new();

    if multi_gpu && truthy(&env.p2p_disable) {
        suspicious.push("NCCL_P2P_DISABLE disables direct GPU P2P on multi-GPU setup.");
    }
    if multi_gpu && truthy(&env.ib_disable) {
        suspicious.push("NCCL_IB_DISABLE disables InfiniBand transport.");
    }
    if matches!(env.socket_ifname.as_deref(), Some("lo") | Some("docker0")) {
        suspicious.push("NCCL_SOCKET_IFNAME is set to loopback/docker interface.");
    }

    let outcome = if suspicious.is_empty() {
        RawOutcome::pass("No obvious NCCL environment misconfiguration detected.")
    } else {
        RawOutcome::warn("Potentially problematic NCCL environment settings detected.").with_remediation([
            "Unset overrides and retry: unset NCCL_P2P_DISABLE NCCL_IB_DISABLE NCCL_SOCKET_IFNAME",
            "Unset restrictive NCCL_* variables unless intentionally required.",
        ])
    };

    outcome
        .with_detail("gpu_count", gpu_count)
        .with_detail("is_container", is_container)
        .with_detail("NCCL_P2P_DISABLE", json!(env.p2p_disable))
        .with_detail("NCCL_IB_DISABLE", json!(env.ib_disable))
        .with_detail("NCCL_SOCKET_IFNAME", json!(env.socket_ifname))
        .with_detail("suspicious", json!(suspicious))
}

pub fn env_config(ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    Ok(env_config_outcome(
        &NcclEnv::from_env(),
        ctx.fact_u64("gpu_count").unwrap_or(0),
        ctx.is_container,
    ))
}

pub fn torch_backend_outcome(info: &TorchInfo, gpu_count: u64) -> RawOutcome {
    let outcome = if gpu_count > 1 && !info.nccl_available {
        RawOutcome::warn("Multi-GPU environment detected but NCCL backend is unavailable.").with_remediation([
            "Install a PyTorch build with distributed/NCCL support.",
            "Verify NCCL runtime libraries are available on the system.",
        ])
    } else {
        RawOutcome::pass("Torch distributed/NCCL backend check completed.")
    };

    outcome
        .with_detail("torch_distributed_available", info.distributed_available)
        .with_detail("nccl_available", info.nccl_available)
        .with_detail("gpu_count", gpu_count)
}

pub fn torch_backend(ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    if !cfg!(target_os = "linux") {
        return Ok(RawOutcome::skip("NCCL backend checks are Linux-only.")
            .with_detail("platform", std::env::consts::OS));
    }

    let info = TorchInfo::from_context(ctx).ok_or_else(|| anyhow::anyhow!("torch inspection fact missing"))?;
    Ok(torch_backend_outcome(&info, ctx.fact_u64("gpu_count").unwrap_or(0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::Status;

    #[test]
    fn test_clean_env_passes() {
        let outcome = env_config_outcome(&NcclEnv::default(), 4, false);
        assert_eq!(outcome.status, Status::Pass);
    }

    #[test]
    fn test_p2p_disable_on_multi_gpu_warns() {
        let env = NcclEnv {
            p2p_disable: Some("1".to_string()),
            ..NcclEnv::default()
        };
        let outcome = env_config_outcome(&env, 8, false);
        assert_eq!(outcome.status, Status::Warn);
        assert_eq!(outcome.details["suspicious"].as_array().map(Vec::len), Some(1));

        // Single GPU: P2P is irrelevant
        assert_eq!(env_config_outcome(&env, 1, true).status, Status::Pass);
    }

    #[test]
    fn test_loopback_ifname_warns() {
        let env = NcclEnv {
            socket_ifname: Some("docker0".to_string()),
            ..NcclEnv::default()
        };
        assert_eq!(env_config_outcome(&env, 0, true).status, Status::Warn);
    }

    #[test]
    fn test_env_config_gate() {
        let single = ProbeContext::new().with_fact("gpu_count", 1);
        assert!(!env_config_applies(&single));

        let multi = ProbeContext::new().with_fact("gpu_count", 2);
        assert_eq!(env_config_applies(&multi), cfg!(target_os = "linux"));
    }

    #[test]
    fn test_backend_missing_nccl_warns() {
        let info = TorchInfo {
            installed: true,
            distributed_available: true,
            nccl_available: false,
            ..TorchInfo::default()
        };
        assert_eq!(torch_backend_outcome(&info, 2).status, Status::Warn);
        assert_eq!(torch_backend_outcome(&info, 1).status, Status::Pass);
    }
}
