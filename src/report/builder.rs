//! Report assembly

use crate::advisor::RemediationPlan;
use crate::analysis::{BenchmarkMeasurement, BottleneckVerdict, ResourceAxis};
use crate::engine::{ExecutionRun, OverallVerdict, RunClock, Summary};
use crate::profiler::StaticProfile;
use crate::report::environment::EnvironmentSnapshot;
use crate::report::types::{Report, ReportKind, SCHEMA_VERSION};
use std::collections::BTreeMap;

/// Builds a [`Report`] from the pieces of one invocation
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    kind: ReportKind,
    clock: RunClock,
    environment: EnvironmentSnapshot,
    run: Option<ExecutionRun>,
    static_profile: Option<StaticProfile>,
    benchmarks: Option<BTreeMap<ResourceAxis, BenchmarkMeasurement>>,
    analysis: Option<BottleneckVerdict>,
    remediation: Option<RemediationPlan>,
}

impl ReportBuilder {
    pub fn new(kind: ReportKind, clock: RunClock, environment: EnvironmentSnapshot) -> Self {
        Self {
            kind,
            clock,
            environment,
            run: None,
            static_profile: None,
            benchmarks: None,
            analysis: None,
            remediation: None,
        }
    }

    pub fn doctor(clock: RunClock, environment: EnvironmentSnapshot) -> Self {
        Self::new(ReportKind::Doctor, clock, environment)
    }

    pub fn profile(clock: RunClock, environment: EnvironmentSnapshot) -> Self {
        Self::new(ReportKind::Profile, clock, environment)
    }

    pub fn with_run(mut self, run: ExecutionRun) -> Self {
        self.run = Some(run);
        self
    }

    pub fn with_static_profile(mut self, profile: StaticProfile) -> Self {
        self.static_profile = Some(profile);
        self
    }

    pub fn with_benchmarks(mut self, measurements: BTreeMap<ResourceAxis, BenchmarkMeasurement>) -> Self {
        self.benchmarks = Some(measurements);
        self
    }

    pub fn with_analysis(mut self, verdict: BottleneckVerdict, plan: RemediationPlan) -> Self {
        self.analysis = Some(verdict);
        self.remediation = Some(plan);
        self
    }

    /// Assemble the report; summary and verdict come from the results
    pub fn build(self) -> Report {
        let (results, total_duration_ms) = match self.run {
            Some(run) => (run.results, run.total_duration_ms),
            None => (Vec::new(), 0.0),
        };

        let summary = Summary::from_results(&results);
        let overall_status = OverallVerdict::from_summary(&summary);

        let mut environment = self.environment;
        environment.timestamp_utc = self.clock.timestamp();

        let (checks, benchmark_results) = match self.kind {
            ReportKind::Doctor => (Some(results), None),
            ReportKind::Profile => (None, Some(results)),
        };

        Report {
            schema_version: SCHEMA_VERSION.to_string(),
            kind: self.kind,
            environment,
            static_profile: self.static_profile,
            checks,
            benchmark_results,
            benchmarks: self.benchmarks,
            summary,
            overall_status,
            analysis: self.analysis,
            remediation: self.remediation,
            total_duration_ms,
        }
    }
}
