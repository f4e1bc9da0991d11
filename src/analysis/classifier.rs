//! Bottleneck classification
//!
//! Turns per-axis benchmark measurements into pressure scores, ranks them and
//! reports the most constrained axis with a confidence value.

use crate::analysis::types::{
    AxisScore, BenchmarkMeasurement, BottleneckVerdict, ClassifierConfig, ExcludedAxis,
    ResourceAxis,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Ranks resource axes by how far they fall short of their baselines
#[derive(Debug, Clone, Default)]
pub struct BottleneckClassifier {
    config: ClassifierConfig,
}

impl BottleneckClassifier {
    /// Create classifier with explicit configuration
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify a set of measurements
    ///
    /// Returns a verdict with no primary axis when nothing could be scored.
    /// The result is a pure function of the measurements and configuration.
    pub fn classify(
        &self,
        measurements: &BTreeMap<ResourceAxis, BenchmarkMeasurement>,
    ) -> BottleneckVerdict {
        let mut scored: Vec<AxisScore> = Vec::new();
        let mut excluded = Vec::new();

        for (&axis, measurement) in measurements {
            match self.score_axis(axis, measurement) {
                Ok(score) => scored.push(score),
                Err(cause) => {
                    debug!(axis = %axis, cause = %cause, "axis excluded from ranking");
                    excluded.push(ExcludedAxis { axis, cause });
                }
            }
        }

        let ranked = self.rank(scored);
        if ranked.is_empty() {
            return BottleneckVerdict {
                excluded,
                ..BottleneckVerdict::empty()
            };
        }

        let confidence = self.confidence(&ranked);
        let reasons = ranked.iter().filter_map(|s| s.reason.clone()).collect();

        BottleneckVerdict {
            primary: ranked.first().map(|s| s.axis),
            secondary: ranked.get(1).map(|s| s.axis),
            confidence,
            reasons,
            scores: ranked,
            excluded,
        }
    }

    /// Pressure score for one measurement, or the reason it can't be scored
    pub fn score_axis(
        &self,
        axis: ResourceAxis,
        measurement: &BenchmarkMeasurement,
    ) -> Result<AxisScore, String> {
        let baseline = self.config.baseline(axis);

        if !measurement.backend_available {
            return Err("backend unavailable".to_string());
        }

        if !measurement.unit.eq_ignore_ascii_case(&baseline.unit) {
            return Err(format!(
                "unit mismatch: measured {} but baseline is {}",
                measurement.unit, baseline.unit
            ));
        }

        let measured = measurement.throughput_or_latency;
        if !measured.is_finite() || measured <= 0.0 {
            return Err(format!("unusable measurement {}", measured));
        }

        let score = if baseline.higher_is_better {
            measured / baseline.value
        } else {
            baseline.value / measured
        };
        if !score.is_finite() {
            return Err(format!("score out of range for measurement {}", measured));
        }

        let notable = score < self.config.notable_cutoff;
        let reason = notable.then(|| {
            let kind = if baseline.higher_is_better { "throughput" } else { "latency" };
            format!(
                "{} {} {:.2} {} is {:.0}% of the {} {} baseline",
                axis,
                kind,
                measured,
                measurement.unit,
                score * 100.0,
                baseline.value,
                baseline.unit
            )
        });

        Ok(AxisScore {
            axis,
            score: round_to(score, 4),
            measured,
            baseline: baseline.value,
            unit: measurement.unit.clone(),
            notable,
            reason,
        })
    }

    /// Order scores from most to least constrained
    ///
    /// Scores within `tie_epsilon` of the lowest remaining score form one
    /// cluster, ordered by axis priority.
    fn rank(&self, mut scores: Vec<AxisScore>) -> Vec<AxisScore> {
        scores.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(Ordering::Equal)
                .then(a.axis.cmp(&b.axis))
        });

        let mut ranked = Vec::with_capacity(scores.len());
        let mut remaining = scores.into_iter().peekable();
        while let Some(anchor) = remaining.next() {
            let floor = anchor.score;
            let mut cluster = vec![anchor];
            while let Some(next) = remaining.next_if(|s| s.score - floor <= self.config.tie_epsilon) {
                cluster.push(next);
            }
            cluster.sort_by_key(|s| s.axis);
            ranked.extend(cluster);
        }
        ranked
    }

    fn confidence(&self, ranked: &[AxisScore]) -> f64 {
        let coverage = ranked.len() as f64 / ResourceAxis::ALL.len() as f64;

        let gap = match (ranked.first(), ranked.get(1)) {
            (Some(first), Some(second)) if second.score > 0.0 => {
                ((second.score - first.score) / second.score).clamp(0.0, 1.0)
            }
            (Some(_), Some(_)) => 0.0,
            _ => 0.5,
        };

        let raw = self.config.coverage_weight * coverage + self.config.gap_weight * gap;
        round_to(raw.clamp(0.0, 1.0), 3)
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let scaled = value * factor;
    if scaled.is_finite() {
        scaled.round() / factor
    } else {
        value
    }
}
