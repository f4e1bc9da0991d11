//! Report document types

use crate::advisor::RemediationPlan;
use crate::analysis::{BenchmarkMeasurement, BottleneckVerdict, ResourceAxis};
use crate::engine::{ExecutionResult, OverallVerdict, Summary};
use crate::errors::Result;
use crate::profiler::StaticProfile;
use crate::report::environment::EnvironmentSnapshot;
use serde::Serialize;
use std::collections::BTreeMap;

/// Report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Which command produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Doctor,
    Profile,
}

impl ReportKind {
    /// File name prefix for persisted reports
    pub fn file_prefix(&self) -> &'static str {
        match self {
            ReportKind::Doctor => "doctor",
            ReportKind::Profile => "profile",
        }
    }
}

/// Complete report for one invocation
///
/// Field order here is the key order of the serialized document.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub schema_version: String,

    #[serde(skip)]
    pub kind: ReportKind,

    pub environment: EnvironmentSnapshot,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_profile: Option<StaticProfile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<ExecutionResult>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark_results: Option<Vec<ExecutionResult>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmarks: Option<BTreeMap<ResourceAxis, BenchmarkMeasurement>>,

    pub summary: Summary,
    pub overall_status: OverallVerdict,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<BottleneckVerdict>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<RemediationPlan>,

    pub total_duration_ms: f64,
}

impl Report {
    /// Pretty JSON with a trailing newline
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Every result in execution order, checks before benchmarks
    pub fn results(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.checks
            .iter()
            .flatten()
            .chain(self.benchmark_results.iter().flatten())
    }

    pub fn exit_code(&self) -> i32 {
        self.overall_status.exit_code()
    }
}
