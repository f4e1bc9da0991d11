//! Bottleneck analysis type definitions

use crate::errors::{DoctorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resource axis a sustained benchmark exercises
///
/// Declaration order doubles as the tie-break priority when two axes score
/// within epsilon of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceAxis {
    Gpu,
    Cpu,
    Memory,
    Disk,
}

impl ResourceAxis {
    /// All axes in tie-break priority order
    pub const ALL: [ResourceAxis; 4] = [
        ResourceAxis::Gpu,
        ResourceAxis::Cpu,
        ResourceAxis::Memory,
        ResourceAxis::Disk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceAxis::Gpu => "gpu",
            ResourceAxis::Cpu => "cpu",
            ResourceAxis::Memory => "memory",
            ResourceAxis::Disk => "disk",
        }
    }
}

impl fmt::Display for ResourceAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceAxis {
    type Err = DoctorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gpu" => Ok(ResourceAxis::Gpu),
            "cpu" => Ok(ResourceAxis::Cpu),
            "memory" => Ok(ResourceAxis::Memory),
            "disk" => Ok(ResourceAxis::Disk),
            other => Err(DoctorError::Config(format!("unknown resource axis '{}'", other))),
        }
    }
}

/// Normalized output of one sustained benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkMeasurement {
    /// Measured value (throughput, or latency when the baseline says lower is better)
    pub throughput_or_latency: f64,

    /// Unit of the measured value, e.g. `GFLOPS`
    pub unit: String,

    /// Warm-up window actually used, in seconds
    pub warmup_s: f64,

    /// Measured window actually used, in seconds
    pub duration_s: f64,

    /// False when the backend needed for this axis was missing
    pub backend_available: bool,

    /// Free-form notes (skipped dtypes, short runs, missing backends)
    #[serde(default)]
    pub notes: Vec<String>,
}

impl BenchmarkMeasurement {
    /// Measurement from a completed benchmark window
    pub fn available(value: f64, unit: impl Into<String>, warmup_s: f64, duration_s: f64) -> Self {
        Self {
            throughput_or_latency: value,
            unit: unit.into(),
            warmup_s,
            duration_s,
            backend_available: true,
            notes: Vec::new(),
        }
    }

    /// Placeholder for an axis whose backend could not be used
    pub fn unavailable(unit: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            throughput_or_latency: 0.0,
            unit: unit.into(),
            warmup_s: 0.0,
            duration_s: 0.0,
            backend_available: false,
            notes: vec![note.into()],
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// Reference value a measurement is compared against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    /// Reference throughput (or latency)
    pub value: f64,

    /// Unit the reference is expressed in
    pub unit: String,

    /// Whether larger measurements are better
    #[serde(default = "default_higher_is_better")]
    pub higher_is_better: bool,
}

fn default_higher_is_better() -> bool {
    true
}

impl Baseline {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
            higher_is_better: true,
        }
    }
}

/// Classifier thresholds and per-axis baselines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// GPU baseline
    pub gpu: Baseline,

    /// CPU baseline
    pub cpu: Baseline,

    /// Memory bandwidth baseline
    pub memory: Baseline,

    /// Disk throughput baseline
    pub disk: Baseline,

    /// Scores below this are flagged as notable
    pub notable_cutoff: f64,

    /// Scores closer than this fall back to axis priority
    pub tie_epsilon: f64,

    /// Weight of axis coverage in the confidence value
    pub coverage_weight: f64,

    /// Weight of the primary/secondary gap in the confidence value
    pub gap_weight: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            gpu: Baseline::new(5000.0, "GFLOPS"),
            cpu: Baseline::new(50.0, "GFLOPS"),
            memory: Baseline::new(10.0, "GB/s"),
            disk: Baseline::new(500.0, "MB/s"),
            notable_cutoff: 1.0,
            tie_epsilon: 0.01,
            coverage_weight: 0.5,
            gap_weight: 0.5,
        }
    }
}

impl ClassifierConfig {
    /// Baseline for one axis
    pub fn baseline(&self, axis: ResourceAxis) -> &Baseline {
        match axis {
            ResourceAxis::Gpu => &self.gpu,
            ResourceAxis::Cpu => &self.cpu,
            ResourceAxis::Memory => &self.memory,
            ResourceAxis::Disk => &self.disk,
        }
    }

    /// Validate thresholds and baselines
    pub fn validate(&self) -> Result<()> {
        for axis in ResourceAxis::ALL {
            let baseline = self.baseline(axis);
            if !baseline.value.is_finite() || baseline.value <= 0.0 {
                return Err(DoctorError::Config(format!(
                    "classifier baseline for {} must be a positive number",
                    axis
                )));
            }
        }

        if self.tie_epsilon < 0.0 {
            return Err(DoctorError::Config("tie_epsilon must be >= 0".to_string()));
        }

        for (name, weight) in [("coverage_weight", self.coverage_weight), ("gap_weight", self.gap_weight)] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(DoctorError::Config(format!("{} must be within [0, 1]", name)));
            }
        }

        if self.coverage_weight + self.gap_weight <= 0.0 {
            return Err(DoctorError::Config(
                "confidence weights must not both be zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Pressure score for one axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisScore {
    pub axis: ResourceAxis,

    /// Measurement relative to baseline; lower means more pressure
    pub score: f64,

    pub measured: f64,
    pub baseline: f64,
    pub unit: String,

    /// True when the score is under the notable cutoff
    pub notable: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Classifier output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckVerdict {
    /// Most constrained axis, if any axis was scored
    pub primary: Option<ResourceAxis>,

    /// Runner-up axis, if at least two were scored
    pub secondary: Option<ResourceAxis>,

    /// Confidence in `[0, 1]`, rounded to three decimals
    pub confidence: f64,

    /// One line per notable axis
    pub reasons: Vec<String>,

    /// Every scored axis, most constrained first
    pub scores: Vec<AxisScore>,

    /// Axes left out of the ranking, with the cause
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded: Vec<ExcludedAxis>,
}

impl BottleneckVerdict {
    /// Verdict for a run with nothing to rank
    pub fn empty() -> Self {
        Self {
            primary: None,
            secondary: None,
            confidence: 0.0,
            reasons: Vec::new(),
            scores: Vec::new(),
            excluded: Vec::new(),
        }
    }

    /// Notable scores in rank order
    pub fn notable(&self) -> impl Iterator<Item = &AxisScore> {
        self.scores.iter().filter(|s| s.notable)
    }
}

/// Axis that could not be scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedAxis {
    pub axis: ResourceAxis,
    pub cause: String,
}
