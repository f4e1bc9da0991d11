//! Sample statistics and the sustained-measurement loop

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Summary statistics over per-iteration rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateStats {
    pub iterations: usize,
    pub mean: f64,
    pub std: f64,
    pub p50: f64,
    pub p95: f64,
    pub min: f64,
    pub max: f64,
}

impl RateStats {
    /// Statistics over finite samples; `None` when there are none
    pub fn from_samples<I: IntoIterator<Item = f64>>(samples: I) -> Option<Self> {
        let mut values: Vec<f64> = samples.into_iter().filter(|v| v.is_finite()).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            iterations: values.len(),
            mean: round6(mean),
            std: round6(variance.sqrt()),
            p50: round6(percentile(&values, 50.0)),
            p95: round6(percentile(&values, 95.0)),
            min: round6(values[0]),
            max: round6(values[values.len() - 1]),
        })
    }
}

/// Linear-interpolated percentile of sorted values
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let rank = (pct.clamp(0.0, 100.0) / 100.0) * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let fraction = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
        }
    }
}

pub fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// Rates collected over one measurement window
#[derive(Debug, Clone)]
pub struct Window {
    /// Work units per second, one entry per iteration
    pub rates: Vec<f64>,

    /// Length of the measured window in seconds
    pub measured_s: f64,
}

/// Run `step` through a warm-up, then measure it for `duration_s`
///
/// `step` returns the amount of work one iteration did. At least one
/// measured iteration always runs.
pub fn sustained<F>(warmup_s: f64, duration_s: f64, mut step: F) -> anyhow::Result<Window>
where
    F: FnMut() -> anyhow::Result<f64>,
{
    let warmup = Duration::from_secs_f64(warmup_s.max(0.0));
    let started = Instant::now();
    while started.elapsed() < warmup {
        step()?;
    }

    let window = Duration::from_secs_f64(duration_s.max(0.0));
    let measured = Instant::now();
    let mut rates = Vec::new();
    loop {
        let lap = Instant::now();
        let work = step()?;
        let secs = lap.elapsed().as_secs_f64();
        if secs > 0.0 {
            rates.push(work / secs);
        }
        if measured.elapsed() >= window {
            break;
        }
    }

    Ok(Window {
        rates,
        measured_s: measured.elapsed().as_secs_f64(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats() {
        let stats = RateStats::from_samples([1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(stats.iterations, 4);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.p50, 2.5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.std - 1.118034).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_samples_dropped() {
        assert!(RateStats::from_samples([f64::NAN, f64::INFINITY]).is_none());
        let stats = RateStats::from_samples([f64::NAN, 5.0]).unwrap();
        assert_eq!(stats.iterations, 1);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [10.0, 20.0, 30.0];
        assert_eq!(percentile(&sorted, 0.0), 10.0);
        assert_eq!(percentile(&sorted, 100.0), 30.0);
        assert_eq!(percentile(&sorted, 75.0), 25.0);
    }

    #[test]
    fn test_sustained_runs_at_least_once() {
        let mut calls = 0;
        let window = sustained(0.0, 0.0, || {
            calls += 1;
            std::thread::sleep(Duration::from_millis(1));
            Ok(1.0)
        })
        .unwrap();
        assert!(calls >= 1);
        assert_eq!(window.rates.len(), calls);
    }

    #[test]
    fn test_sustained_propagates_errors() {
        let result = sustained(0.0, 1.0, || anyhow::bail!("device lost"));
        assert!(result.is_err());
    }
}
