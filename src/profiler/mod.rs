//! Performance profiler
//! Sustained benchmarks, static hardware profile and measurement collection

pub mod benchmarks;
pub mod settings;
pub mod static_profile;
pub mod stats;

pub use settings::{AxisSettings, BenchmarkSettings};
pub use static_profile::{DiskInfo, GpuInventory, StaticProfile};
pub use stats::RateStats;

use crate::analysis::{BenchmarkMeasurement, ResourceAxis};
use crate::engine::ExecutionResult;
use crate::errors::Result;
use crate::probes::{ProbeDefinition, ProbeRegistry};
use std::collections::BTreeMap;
use tracing::debug;

/// Category shared by every benchmark
pub const BENCHMARK_CATEGORY: &str = "benchmark";

/// Register the built-in benchmarks, GPU first
pub fn register_builtin_benchmarks(registry: &mut ProbeRegistry) -> Result<()> {
    registry.register(ProbeDefinition::benchmark(
        "benchmark.gpu_sustained",
        BENCHMARK_CATEGORY,
        "GPU sustained matmul throughput",
        ResourceAxis::Gpu,
        benchmarks::gpu_sustained,
    ))?;
    registry.register(ProbeDefinition::benchmark(
        "benchmark.cpu_sustained",
        BENCHMARK_CATEGORY,
        "CPU sustained matmul throughput",
        ResourceAxis::Cpu,
        benchmarks::cpu_sustained,
    ))?;
    registry.register(ProbeDefinition::benchmark(
        "benchmark.memory_bandwidth",
        BENCHMARK_CATEGORY,
        "Host memory copy bandwidth",
        ResourceAxis::Memory,
        benchmarks::memory_bandwidth,
    ))?;
    registry.register(ProbeDefinition::benchmark(
        "benchmark.disk_io",
        BENCHMARK_CATEGORY,
        "Scratch disk write/read throughput",
        ResourceAxis::Disk,
        benchmarks::disk_io,
    ))?;
    Ok(())
}

/// Registry holding only the built-in benchmarks
pub fn builtin_registry() -> Result<ProbeRegistry> {
    let mut registry = ProbeRegistry::new();
    register_builtin_benchmarks(&mut registry)?;
    Ok(registry)
}

/// Pull normalized measurements out of benchmark results
///
/// Results without a measurement (disabled axes, errors) are left out, so the
/// classifier never sees them.
pub fn collect_measurements(results: &[ExecutionResult]) -> BTreeMap<ResourceAxis, BenchmarkMeasurement> {
    let mut measurements = BTreeMap::new();

    for result in results {
        let Some(axis) = result.axis else { continue };
        let Some(raw) = result.outcome.details.get("measurement") else { continue };

        match serde_json::from_value::<BenchmarkMeasurement>(raw.clone()) {
            Ok(measurement) => {
                measurements.insert(axis, measurement);
            }
            Err(err) => debug!(probe = %result.id, error = %err, "ignoring malformed measurement"),
        }
    }

    measurements
}
