//! Sustained benchmarks
//!
//! One benchmark per resource axis. Each reports a PASS with its
//! [`BenchmarkMeasurement`] under `details.measurement`, or a SKIP when the
//! axis is switched off or has no backend.

use crate::analysis::{BenchmarkMeasurement, ResourceAxis};
use crate::probes::{ProbeContext, RawOutcome};
use crate::profiler::stats::{round6, sustained, RateStats, Window};
use anyhow::{anyhow, Context};
use candle_core::{DType, Device, Tensor};
use rand::Rng;
use std::hint::black_box;
use std::io::{Read, Seek, SeekFrom, Write};

/// Fewer measured iterations than this get a noise note
pub const MIN_ITERATIONS: usize = 5;

const MIB: usize = 1024 * 1024;

/// Unit each axis reports in
pub fn axis_unit(axis: ResourceAxis) -> &'static str {
    match axis {
        ResourceAxis::Gpu | ResourceAxis::Cpu => "GFLOPS",
        ResourceAxis::Memory => "GB/s",
        ResourceAxis::Disk => "MB/s",
    }
}

fn unit_scale(axis: ResourceAxis) -> f64 {
    match axis {
        ResourceAxis::Gpu | ResourceAxis::Cpu | ResourceAxis::Memory => 1e9,
        ResourceAxis::Disk => 1e6,
    }
}

/// SKIP for an axis switched off by the invocation; no measurement recorded
fn disabled(axis: ResourceAxis, note: &str) -> RawOutcome {
    RawOutcome::skip(format!("{} benchmark skipped: {}", axis, note)).with_detail("note", note)
}

/// SKIP for an axis whose backend is missing; recorded as unavailable
fn unavailable(axis: ResourceAxis, note: &str) -> anyhow::Result<RawOutcome> {
    let measurement = BenchmarkMeasurement::unavailable(axis_unit(axis), note);
    Ok(RawOutcome::skip(format!("{} benchmark skipped: {}", axis, note))
        .with_detail("measurement", serde_json::to_value(&measurement)?))
}

fn finish(
    axis: ResourceAxis,
    ctx: &ProbeContext,
    window: Window,
    notes: Vec<String>,
) -> anyhow::Result<RawOutcome> {
    let settings = ctx.benchmarks.for_axis(axis);
    let scale = unit_scale(axis);
    let unit = axis_unit(axis);

    let stats = RateStats::from_samples(window.rates.iter().map(|r| r / scale))
        .ok_or_else(|| anyhow!("{} benchmark produced no usable samples", axis))?;

    // Configured window; the measured wall-clock length only goes into details
    let mut measurement = BenchmarkMeasurement::available(stats.mean, unit, settings.warmup_s, settings.duration_s);
    measurement.notes = notes;
    if stats.iterations < MIN_ITERATIONS {
        measurement = measurement.with_note(format!(
            "only {} measured iterations; result may be noisy",
            stats.iterations
        ));
    }

    let mut outcome = RawOutcome::pass(format!("{} sustained {:.2} {}", axis, stats.mean, unit))
        .with_detail("size", settings.size as u64)
        .with_detail("stats", serde_json::to_value(&stats)?)
        .with_detail("measurement", serde_json::to_value(&measurement)?);
    if !ctx.deterministic {
        outcome = outcome.with_detail("measured_window_s", round6(window.measured_s));
    }
    Ok(outcome)
}

fn random_matrix(n: usize, dtype: DType, device: &Device) -> anyhow::Result<Tensor> {
    Ok(Tensor::randn(0f32, 1f32, (n, n), device)?.to_dtype(dtype)?)
}

/// One matmul, forced to completion by reading a scalar back
fn matmul_step(a: &Tensor, b: &Tensor) -> anyhow::Result<()> {
    let c = a.matmul(b)?;
    black_box(c.sum_all()?.to_dtype(DType::F32)?.to_scalar::<f32>()?);
    Ok(())
}

/// CPU matmul throughput in GFLOPS
pub fn cpu_sustained(ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let axis = ResourceAxis::Cpu;
    if let Some(note) = ctx.benchmarks.disabled_reason(axis) {
        return Ok(disabled(axis, note));
    }

    let settings = ctx.benchmarks.for_axis(axis);
    let n = settings.size;
    let device = Device::Cpu;
    let a = random_matrix(n, DType::F32, &device)?;
    let b = random_matrix(n, DType::F32, &device)?;
    let flops = 2.0 * (n as f64).powi(3);

    let window = sustained(settings.warmup_s, settings.duration_s, || {
        matmul_step(&a, &b)?;
        Ok(flops)
    })?;

    Ok(finish(axis, ctx, window, vec![format!("f32 {}x{} matmul", n, n)])?
        .with_detail("logical_cpus", num_cpus::get() as u64))
}

/// Host memory copy bandwidth in GB/s (bytes read plus bytes written)
pub fn memory_bandwidth(ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let axis = ResourceAxis::Memory;
    if let Some(note) = ctx.benchmarks.disabled_reason(axis) {
        return Ok(disabled(axis, note));
    }

    let settings = ctx.benchmarks.for_axis(axis);
    let bytes = settings.size * MIB;
    let mut source = vec![0u8; bytes];
    rand::thread_rng().fill(&mut source[..]);
    let mut target = vec![0u8; bytes];
    let traffic = 2.0 * bytes as f64;

    let window = sustained(settings.warmup_s, settings.duration_s, || {
        target.copy_from_slice(&source);
        black_box(&target);
        Ok(traffic)
    })?;

    finish(axis, ctx, window, vec![format!("{} MiB buffer copy", settings.size)])
}

fn gpu_device() -> anyhow::Result<Option<(Device, &'static str)>> {
    if candle_core::utils::cuda_is_available() {
        return Ok(Some((Device::new_cuda(0)?, "cuda")));
    }
    if candle_core::utils::metal_is_available() {
        return Ok(Some((Device::new_metal(0)?, "metal")));
    }
    Ok(None)
}

/// Accelerator matmul throughput in GFLOPS
///
/// Tries half precision first and falls back to f32 when a dtype is not
/// supported by the device.
pub fn gpu_sustained(ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let axis = ResourceAxis::Gpu;
    if let Some(note) = ctx.benchmarks.disabled_reason(axis) {
        return Ok(disabled(axis, note));
    }

    let Some((device, backend)) = gpu_device()? else {
        return unavailable(axis, "no CUDA or Metal device available");
    };

    let settings = ctx.benchmarks.for_axis(axis);
    let n = settings.size;
    let mut notes = Vec::new();

    for dtype in [DType::F16, DType::BF16, DType::F32] {
        let prepared = random_matrix(n, dtype, &device).and_then(|a| {
            let b = random_matrix(n, dtype, &device)?;
            matmul_step(&a, &b)?;
            Ok((a, b))
        });

        let (a, b) = match prepared {
            Ok(pair) => pair,
            Err(err) => {
                notes.push(format!("{:?} unsupported: {}", dtype, err));
                continue;
            }
        };

        let flops = 2.0 * (n as f64).powi(3);
        let window = sustained(settings.warmup_s, settings.duration_s, || {
            matmul_step(&a, &b)?;
            Ok(flops)
        })?;

        notes.push(format!("{:?} {}x{} matmul on {}", dtype, n, n, backend));
        return Ok(finish(axis, ctx, window, notes)?
            .with_detail("backend", backend)
            .with_detail("dtype", format!("{:?}", dtype).to_lowercase()));
    }

    Err(anyhow!("no supported dtype on {}: {}", backend, notes.join("; ")))
}

/// Temp-file write+fsync+read throughput in MB/s
pub fn disk_io(ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let axis = ResourceAxis::Disk;
    if let Some(note) = ctx.benchmarks.disabled_reason(axis) {
        return Ok(disabled(axis, note));
    }

    let settings = ctx.benchmarks.for_axis(axis);
    let bytes = settings.size * MIB;
    let mut payload = vec![0u8; bytes];
    rand::thread_rng().fill(&mut payload[..]);
    let mut readback = vec![0u8; bytes];

    let mut scratch = tempfile::tempfile().context("failed to create scratch file")?;
    let traffic = 2.0 * bytes as f64;

    let window = sustained(settings.warmup_s, settings.duration_s, || {
        scratch.seek(SeekFrom::Start(0))?;
        scratch.write_all(&payload)?;
        scratch.sync_all()?;
        scratch.seek(SeekFrom::Start(0))?;
        scratch.read_exact(&mut readback)?;
        black_box(&readback);
        Ok(traffic)
    })?;

    finish(
        axis,
        ctx,
        window,
        vec![
            format!("{} MiB write+fsync+read", settings.size),
            "reads may be served from page cache".to_string(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::Status;
    use crate::profiler::BenchmarkSettings;

    fn quick_ctx() -> ProbeContext {
        let mut settings = BenchmarkSettings::default().with_window(Some(0.0), Some(0.05));
        settings.cpu.size = 32;
        settings.memory.size = 1;
        settings.disk.size = 1;
        settings.gpu.size = 64;
        ProbeContext::new().with_benchmarks(settings)
    }

    fn measurement(outcome: &RawOutcome) -> BenchmarkMeasurement {
        serde_json::from_value(outcome.details["measurement"].clone()).unwrap()
    }

    #[test]
    fn test_cpu_benchmark_reports_gflops() {
        let outcome = cpu_sustained(&quick_ctx()).unwrap();
        assert_eq!(outcome.status, Status::Pass);
        let m = measurement(&outcome);
        assert_eq!(m.unit, "GFLOPS");
        assert!(m.backend_available);
        assert!(m.throughput_or_latency > 0.0);
    }

    #[test]
    fn test_memory_benchmark_reports_bandwidth() {
        let outcome = memory_bandwidth(&quick_ctx()).unwrap();
        assert_eq!(measurement(&outcome).unit, "GB/s");
    }

    #[test]
    fn test_disk_benchmark_reports_throughput() {
        let outcome = disk_io(&quick_ctx()).unwrap();
        assert_eq!(outcome.status, Status::Pass);
        assert_eq!(measurement(&outcome).unit, "MB/s");
    }

    #[test]
    fn test_deterministic_measurement_uses_configured_window() {
        let ctx = quick_ctx().with_deterministic(true);
        let window = Window {
            rates: vec![4e9; 8],
            measured_s: 0.073_219,
        };

        let outcome = finish(ResourceAxis::Memory, &ctx, window.clone(), Vec::new()).unwrap();
        let m = measurement(&outcome);
        assert_eq!(m.duration_s, 0.05);
        assert_eq!(m.throughput_or_latency, 4.0);
        assert!(!outcome.details.contains_key("measured_window_s"));

        let outcome = finish(ResourceAxis::Memory, &quick_ctx(), window, Vec::new()).unwrap();
        assert_eq!(measurement(&outcome).duration_s, 0.05);
        assert_eq!(outcome.details["measured_window_s"], 0.073219);
    }

    #[test]
    fn test_disabled_axis_skips_without_measurement() {
        let mut ctx = quick_ctx();
        ctx.benchmarks.disable(ResourceAxis::Gpu, "disabled by --no-gpu");

        let outcome = gpu_sustained(&ctx).unwrap();
        assert_eq!(outcome.status, Status::Skip);
        assert!(!outcome.details.contains_key("measurement"));
        assert_eq!(outcome.details["note"], "disabled by --no-gpu");
    }

    #[test]
    fn test_gpu_benchmark_never_errors_without_device() {
        // Either a real device measured it or it was skipped as unavailable
        let outcome = gpu_sustained(&quick_ctx()).unwrap();
        let m = measurement(&outcome);
        match outcome.status {
            Status::Skip => assert!(!m.backend_available),
            Status::Pass => assert!(m.backend_available),
            other => panic!("unexpected status {}", other),
        }
    }
}
