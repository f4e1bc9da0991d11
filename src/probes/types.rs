//! Probe type definitions
//!
//! A probe is one diagnostic check or one sustained benchmark. Probes are
//! registered once at startup and run by the execution engine.

use crate::analysis::ResourceAxis;
use crate::profiler::BenchmarkSettings;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Outcome status of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Warn,
    Fail,
    Skip,
    Error,
}

impl Status {
    /// Every status in summary order
    pub const ALL: [Status; 5] = [
        Status::Pass,
        Status::Warn,
        Status::Fail,
        Status::Skip,
        Status::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Warn => "WARN",
            Status::Fail => "FAIL",
            Status::Skip => "SKIP",
            Status::Error => "ERROR",
        }
    }

    /// Severity a fresh outcome with this status starts at
    pub fn default_severity(&self) -> u8 {
        match self {
            Status::Pass | Status::Skip => 0,
            Status::Warn => 1,
            Status::Fail => 3,
            Status::Error => 4,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Highest severity an outcome may carry
pub const MAX_SEVERITY: u8 = 4;

/// What one probe reports back to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOutcome {
    pub status: Status,

    /// Short human-readable summary
    pub message: String,

    /// Structured, JSON-representable details
    #[serde(default)]
    pub details: Map<String, Value>,

    /// Suggested fixes, when the probe has any
    #[serde(default)]
    pub remediation: Option<Vec<String>>,

    /// 0 (informational) to 4 (critical)
    #[serde(default)]
    pub severity: u8,

    /// Wall time spent in the probe; stamped by the engine
    #[serde(default)]
    pub duration_ms: f64,

    /// Facts published for probes that run later
    #[serde(skip)]
    pub facts: BTreeMap<String, Value>,
}

impl RawOutcome {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: Map::new(),
            remediation: None,
            severity: status.default_severity(),
            duration_ms: 0.0,
            facts: BTreeMap::new(),
        }
    }

    pub fn pass(message: impl Into<String>) -> Self {
        Self::new(Status::Pass, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(Status::Warn, message)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::new(Status::Fail, message)
    }

    pub fn skip(message: impl Into<String>) -> Self {
        Self::new(Status::Skip, message)
    }

    /// Outcome for a probe that crashed, errored or timed out
    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self::new(Status::Error, message)
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_remediation<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remediation = Some(steps.into_iter().map(Into::into).collect());
        self
    }

    /// Override severity, capped at [`MAX_SEVERITY`]
    pub fn with_severity(mut self, severity: u8) -> Self {
        self.severity = severity.min(MAX_SEVERITY);
        self
    }

    pub fn with_fact(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.facts.insert(key.into(), value.into());
        self
    }
}

/// Whether a probe is a point-in-time check or a sustained benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Check,
    Benchmark,
}

/// Shared state handed to every probe
///
/// Carries the determinism flag, benchmark settings, facts published by
/// earlier probes and the statuses they ended with.
#[derive(Debug, Clone, Default)]
pub struct ProbeContext {
    /// Volatile values must be suppressed
    pub deterministic: bool,

    /// Running inside a container
    pub is_container: bool,

    /// Running under WSL
    pub is_wsl: bool,

    /// Benchmark windows, sizes and disabled axes
    pub benchmarks: BenchmarkSettings,

    facts: BTreeMap<String, Value>,
    statuses: BTreeMap<String, Status>,
}

impl ProbeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    pub fn with_platform(mut self, is_container: bool, is_wsl: bool) -> Self {
        self.is_container = is_container;
        self.is_wsl = is_wsl;
        self
    }

    pub fn with_benchmarks(mut self, benchmarks: BenchmarkSettings) -> Self {
        self.benchmarks = benchmarks;
        self
    }

    pub fn with_fact(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.facts.insert(key.into(), value.into());
        self
    }

    pub fn fact(&self, key: &str) -> Option<&Value> {
        self.facts.get(key)
    }

    pub fn fact_str(&self, key: &str) -> Option<&str> {
        self.fact(key).and_then(Value::as_str)
    }

    pub fn fact_u64(&self, key: &str) -> Option<u64> {
        self.fact(key).and_then(Value::as_u64)
    }

    pub fn fact_bool(&self, key: &str) -> bool {
        self.fact(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn facts(&self) -> &BTreeMap<String, Value> {
        &self.facts
    }

    /// Status an earlier probe ended with
    pub fn status_of(&self, id: &str) -> Option<Status> {
        self.statuses.get(id).copied()
    }

    /// True when the earlier probe ran and passed
    pub fn passed(&self, id: &str) -> bool {
        self.status_of(id) == Some(Status::Pass)
    }

    pub(crate) fn record(&mut self, id: &str, status: Status, facts: &BTreeMap<String, Value>) {
        self.statuses.insert(id.to_string(), status);
        for (key, value) in facts {
            self.facts.insert(key.clone(), value.clone());
        }
    }
}

/// Body of a probe
///
/// Implementations run on a blocking worker thread and may call external
/// tools. Returning `Err` (or panicking) is turned into an `ERROR` outcome by
/// the engine; it never aborts the run.
pub trait Probe: Send + Sync {
    /// Gate evaluated before `run`; false records a SKIP
    fn should_run(&self, _ctx: &ProbeContext) -> bool {
        true
    }

    fn run(&self, ctx: &ProbeContext) -> anyhow::Result<RawOutcome>;
}

impl<F> Probe for F
where
    F: Fn(&ProbeContext) -> anyhow::Result<RawOutcome> + Send + Sync,
{
    fn run(&self, ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
        self(ctx)
    }
}

/// Gate function for plain-function probes
pub type Gate = fn(&ProbeContext) -> bool;

/// Metadata plus body of a registered probe
#[derive(Clone)]
pub struct ProbeDefinition {
    /// Dotted identifier, `category.name`
    pub id: String,

    /// Grouping used by `--only` / `--exclude`
    pub category: String,

    /// Human-readable title
    pub title: String,

    pub kind: ProbeKind,

    /// Axis exercised, for benchmarks
    pub axis: Option<ResourceAxis>,

    gate: Option<Gate>,
    probe: Arc<dyn Probe>,
}

impl ProbeDefinition {
    /// Define a diagnostic check
    pub fn check(
        id: impl Into<String>,
        category: impl Into<String>,
        title: impl Into<String>,
        probe: impl Probe + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            title: title.into(),
            kind: ProbeKind::Check,
            axis: None,
            gate: None,
            probe: Arc::new(probe),
        }
    }

    /// Define a sustained benchmark for one axis
    pub fn benchmark(
        id: impl Into<String>,
        category: impl Into<String>,
        title: impl Into<String>,
        axis: ResourceAxis,
        probe: impl Probe + 'static,
    ) -> Self {
        Self {
            kind: ProbeKind::Benchmark,
            axis: Some(axis),
            ..Self::check(id, category, title, probe)
        }
    }

    /// Only run when `gate` holds for the context
    pub fn only_when(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Evaluate both the definition gate and the probe's own gate
    pub fn should_run(&self, ctx: &ProbeContext) -> bool {
        self.gate.map_or(true, |gate| gate(ctx)) && self.probe.should_run(ctx)
    }

    pub fn probe(&self) -> Arc<dyn Probe> {
        Arc::clone(&self.probe)
    }
}

impl fmt::Debug for ProbeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeDefinition")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("title", &self.title)
            .field("kind", &self.kind)
            .field("axis", &self.axis)
            .field("gated", &self.gate.is_some())
            .finish()
    }
}
