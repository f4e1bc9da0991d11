//! Doctor command - built-in environment health checks
//!
//! Each check is a plain function from `ProbeContext` to `RawOutcome`. Later
//! checks read facts published by earlier ones (`gpu_count`, `torch`, ...), so
//! the registration order below is also the dependency order.

pub mod command;
pub mod cuda;
pub mod environment;
pub mod gpu;
pub mod nccl;
pub mod pytorch;
pub mod system;

use crate::errors::Result;
use crate::probes::{ProbeContext, ProbeDefinition, ProbeRegistry};

fn linux(_ctx: &ProbeContext) -> bool {
    cfg!(target_os = "linux")
}

fn linux_or_windows(_ctx: &ProbeContext) -> bool {
    cfg!(any(target_os = "linux", target_os = "windows"))
}

fn nvidia_smi_passed(ctx: &ProbeContext) -> bool {
    ctx.passed("driver.nvidia_smi")
}

fn throttle_queryable(ctx: &ProbeContext) -> bool {
    linux(ctx) && nvidia_smi_passed(ctx)
}

fn linux_container(ctx: &ProbeContext) -> bool {
    linux(ctx) && ctx.is_container
}

fn torch_installed(ctx: &ProbeContext) -> bool {
    ctx.passed("pytorch.installed")
}

/// Register the built-in checks in execution order
pub fn register_builtin_checks(registry: &mut ProbeRegistry) -> Result<()> {
    let checks = [
        ProbeDefinition::check(
            "environment.python_version",
            "environment",
            "Python version",
            environment::python_version,
        ),
        ProbeDefinition::check(
            "environment.venv",
            "environment",
            "Virtual environment",
            environment::venv,
        ),
        ProbeDefinition::check(
            "environment.runtime",
            "environment",
            "Runtime platform",
            environment::runtime,
        ),
        ProbeDefinition::check("system.dev_shm", "system", "/dev/shm size", system::dev_shm).only_when(linux),
        ProbeDefinition::check("system.memory", "system", "Host memory", system::memory),
        ProbeDefinition::check("system.disk_space", "system", "Free disk space", system::disk_space),
        ProbeDefinition::check("driver.nvidia_smi", "driver", "nvidia-smi", gpu::nvidia_smi_check)
            .only_when(linux_or_windows),
        ProbeDefinition::check("gpu.nvml_devices", "gpu", "GPU devices", gpu::nvml_devices)
            .only_when(nvidia_smi_passed),
        ProbeDefinition::check(
            "gpu.persistence_mode",
            "gpu",
            "GPU persistence mode",
            gpu::persistence_mode,
        )
        .only_when(nvidia_smi_passed),
        ProbeDefinition::check(
            "gpu.clock_throttle_reasons",
            "gpu",
            "GPU clock throttle reasons",
            gpu::clock_throttle_reasons,
        )
        .only_when(throttle_queryable),
        ProbeDefinition::check(
            "runtime.gpu_passthrough",
            "runtime",
            "Container GPU passthrough",
            gpu::gpu_passthrough,
        )
        .only_when(linux_container),
        ProbeDefinition::check(
            "cuda.driver_version",
            "cuda",
            "NVIDIA driver version",
            cuda::driver_version,
        ),
        ProbeDefinition::check("cuda.toolkit_nvcc", "cuda", "CUDA toolkit (nvcc)", cuda::toolkit_nvcc),
        ProbeDefinition::check("pytorch.installed", "pytorch", "PyTorch installed", pytorch::installed),
        ProbeDefinition::check(
            "pytorch.cuda_available",
            "pytorch",
            "PyTorch CUDA availability",
            pytorch::cuda_available,
        )
        .only_when(torch_installed),
        ProbeDefinition::check(
            "pytorch.cuda_version",
            "pytorch",
            "PyTorch CUDA version",
            pytorch::cuda_version,
        )
        .only_when(torch_installed),
        ProbeDefinition::check(
            "gpu.device_properties",
            "gpu",
            "GPU device properties",
            pytorch::device_properties,
        )
        .only_when(torch_installed),
        ProbeDefinition::check(
            "cuda.driver_cuda_compat",
            "cuda",
            "Driver/CUDA compatibility",
            cuda::driver_cuda_compat,
        )
        .only_when(cuda::has_versions_to_compare),
        ProbeDefinition::check("cuda.runtime_hint", "cuda", "CUDA runtime path", cuda::runtime_hint)
            .only_when(linux),
        ProbeDefinition::check("nccl.env_config", "nccl", "NCCL environment", nccl::env_config)
            .only_when(nccl::env_config_applies),
        ProbeDefinition::check(
            "nccl.torch_backend",
            "nccl",
            "Torch NCCL backend",
            nccl::torch_backend,
        )
        .only_when(torch_installed),
    ];

    for check in checks {
        registry.register(check)?;
    }
    Ok(())
}

/// Registry holding only the built-in checks
pub fn builtin_registry() -> Result<ProbeRegistry> {
    let mut registry = ProbeRegistry::new();
    register_builtin_checks(&mut registry)?;
    Ok(registry)
}
