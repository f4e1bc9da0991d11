//! Execution result types

use crate::analysis::ResourceAxis;
use crate::probes::{ProbeContext, ProbeDefinition, ProbeKind, RawOutcome, Status};
use serde::{Deserialize, Serialize};

/// Outcome of one probe, annotated with its identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub id: String,
    pub title: String,
    pub category: String,

    #[serde(skip, default = "default_kind")]
    pub kind: ProbeKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<ResourceAxis>,

    #[serde(flatten)]
    pub outcome: RawOutcome,

    /// When the probe started, from the run clock
    pub started_at: String,
}

fn default_kind() -> ProbeKind {
    ProbeKind::Check
}

impl ExecutionResult {
    pub fn new(definition: &ProbeDefinition, outcome: RawOutcome, started_at: String) -> Self {
        Self {
            id: definition.id.clone(),
            title: definition.title.clone(),
            category: definition.category.clone(),
            kind: definition.kind,
            axis: definition.axis,
            outcome,
            started_at,
        }
    }

    pub fn status(&self) -> Status {
        self.outcome.status
    }

    pub fn is_benchmark(&self) -> bool {
        self.kind == ProbeKind::Benchmark
    }
}

/// Everything one engine run produced
#[derive(Debug, Clone)]
pub struct ExecutionRun {
    /// Results in execution order
    pub results: Vec<ExecutionResult>,

    /// Wall time for the whole run; 0.0 on a frozen clock
    pub total_duration_ms: f64,

    /// Context after the last probe, including every published fact
    pub context: ProbeContext,
}

impl ExecutionRun {
    pub fn checks(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.results.iter().filter(|r| !r.is_benchmark())
    }

    pub fn benchmarks(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.results.iter().filter(|r| r.is_benchmark())
    }
}
