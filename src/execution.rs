//! Shared doctor/profile execution logic
//!
//! Wires selection, the execution engine, the classifier, the advisor and the
//! report builder together. `main` only adds terminal I/O around these.

use crate::advisor::RemediationAdvisor;
use crate::analysis::{BottleneckClassifier, ClassifierConfig, ResourceAxis};
use crate::config::Config;
use crate::engine::{ExecutionEngine, ExecutionRun, RunClock, DEFAULT_PROBE_TIMEOUT};
use crate::errors::Result;
use crate::probes::{ProbeContext, ProbeRegistry, Selector};
use crate::profiler::{collect_measurements, BenchmarkSettings, StaticProfile};
use crate::report::{EnvironmentSnapshot, Report, ReportBuilder};
use std::time::Duration;
use tracing::info;

/// Knobs for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Freeze timestamps and durations
    pub deterministic: bool,

    /// Per-unit wall-clock limit
    pub timeout: Duration,

    pub benchmarks: BenchmarkSettings,
    pub classifier: ClassifierConfig,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            deterministic: false,
            timeout: DEFAULT_PROBE_TIMEOUT,
            benchmarks: BenchmarkSettings::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            deterministic: false,
            timeout: config.doctor.probe_timeout(),
            benchmarks: config.benchmarks.clone(),
            classifier: config.classifier.clone(),
        }
    }

    pub fn with_deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    /// Override the per-unit timeout when one was given
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        if let Some(timeout) = timeout {
            self.timeout = timeout;
        }
        self
    }

    /// Override every benchmark window
    pub fn with_window(mut self, warmup_s: Option<f64>, duration_s: Option<f64>) -> Self {
        self.benchmarks = self.benchmarks.with_window(warmup_s, duration_s);
        self
    }

    /// `--no-gpu`: the GPU benchmark reports SKIP
    pub fn without_gpu(mut self) -> Self {
        self.benchmarks.disable(ResourceAxis::Gpu, "GPU benchmark disabled by --no-gpu");
        self
    }

    /// `--static-only`: every benchmark reports SKIP
    pub fn static_only(mut self) -> Self {
        for axis in ResourceAxis::ALL {
            self.benchmarks.disable(axis, "benchmarks disabled by --static-only");
        }
        self
    }

    fn clock(&self) -> RunClock {
        RunClock::from_deterministic(self.deterministic)
    }

    fn context(&self, environment: &EnvironmentSnapshot) -> ProbeContext {
        ProbeContext::new()
            .with_deterministic(self.deterministic)
            .with_platform(environment.is_container, environment.is_wsl)
            .with_benchmarks(self.benchmarks.clone())
    }

    async fn execute(
        &self,
        registry: &ProbeRegistry,
        selector: &Selector,
        environment: &EnvironmentSnapshot,
    ) -> Result<ExecutionRun> {
        self.benchmarks.validate()?;
        let units = selector.resolve(registry)?;
        let engine = ExecutionEngine::new(self.clock()).with_timeout(self.timeout);
        Ok(engine.run(&units, self.context(environment)).await)
    }
}

/// Run the doctor flow and assemble its report
pub async fn run_doctor(
    registry: &ProbeRegistry,
    selector: &Selector,
    options: &RunOptions,
    environment: EnvironmentSnapshot,
) -> Result<Report> {
    let run = options.execute(registry, selector, &environment).await?;
    let report = ReportBuilder::doctor(options.clock(), environment)
        .with_run(run)
        .build();

    info!(status = %report.overall_status, "doctor run finished");
    Ok(report)
}

/// Run the profile flow: benchmarks, classification and remediation
pub async fn run_profile(
    registry: &ProbeRegistry,
    selector: &Selector,
    options: &RunOptions,
    environment: EnvironmentSnapshot,
    static_profile: StaticProfile,
) -> Result<Report> {
    options.classifier.validate()?;
    let run = options.execute(registry, selector, &environment).await?;

    let measurements = collect_measurements(&run.results);
    let verdict = BottleneckClassifier::new(options.classifier.clone()).classify(&measurements);
    let plan = RemediationAdvisor::new().plan(&verdict, &measurements);

    info!(
        primary = ?verdict.primary,
        confidence = verdict.confidence,
        actions = plan.len(),
        "profile run finished"
    );

    Ok(ReportBuilder::profile(options.clock(), environment)
        .with_static_profile(static_profile)
        .with_benchmarks(measurements)
        .with_analysis(verdict, plan)
        .with_run(run)
        .build())
}
