//! Benchmark window and workload settings

use crate::analysis::ResourceAxis;
use crate::errors::{DoctorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound accepted for any warm-up or measurement window, in seconds
pub const MAX_WINDOW_SECS: f64 = 3600.0;

/// Largest matrix edge accepted for the compute axes
pub const MAX_MATRIX_EDGE: usize = 16384;

/// Largest buffer accepted for the memory and disk axes, in MiB
pub const MAX_BUFFER_MIB: usize = 4096;

/// Upper bound on `size` for one axis
pub fn max_size(axis: ResourceAxis) -> usize {
    match axis {
        ResourceAxis::Gpu | ResourceAxis::Cpu => MAX_MATRIX_EDGE,
        ResourceAxis::Memory | ResourceAxis::Disk => MAX_BUFFER_MIB,
    }
}

/// Window and problem size for one axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSettings {
    /// Warm-up time before measurement starts
    pub warmup_s: f64,

    /// Measurement window
    pub duration_s: f64,

    /// Matrix edge for compute axes, MiB for memory and disk
    pub size: usize,
}

impl AxisSettings {
    pub fn new(warmup_s: f64, duration_s: f64, size: usize) -> Self {
        Self {
            warmup_s,
            duration_s,
            size,
        }
    }
}

/// Settings for every benchmark axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkSettings {
    pub gpu: AxisSettings,
    pub cpu: AxisSettings,
    pub memory: AxisSettings,
    pub disk: AxisSettings,

    /// Axes switched off for this run, with the note to report
    #[serde(skip)]
    disabled: BTreeMap<ResourceAxis, String>,
}

impl Default for BenchmarkSettings {
    fn default() -> Self {
        Self {
            gpu: AxisSettings::new(2.0, 8.0, 4096),
            cpu: AxisSettings::new(1.0, 4.0, 256),
            memory: AxisSettings::new(0.5, 3.0, 64),
            disk: AxisSettings::new(0.5, 3.0, 64),
            disabled: BTreeMap::new(),
        }
    }
}

impl BenchmarkSettings {
    pub fn for_axis(&self, axis: ResourceAxis) -> &AxisSettings {
        match axis {
            ResourceAxis::Gpu => &self.gpu,
            ResourceAxis::Cpu => &self.cpu,
            ResourceAxis::Memory => &self.memory,
            ResourceAxis::Disk => &self.disk,
        }
    }

    fn for_axis_mut(&mut self, axis: ResourceAxis) -> &mut AxisSettings {
        match axis {
            ResourceAxis::Gpu => &mut self.gpu,
            ResourceAxis::Cpu => &mut self.cpu,
            ResourceAxis::Memory => &mut self.memory,
            ResourceAxis::Disk => &mut self.disk,
        }
    }

    /// Override warm-up and/or duration on every axis
    pub fn with_window(mut self, warmup_s: Option<f64>, duration_s: Option<f64>) -> Self {
        for axis in ResourceAxis::ALL {
            let settings = self.for_axis_mut(axis);
            if let Some(warmup) = warmup_s {
                settings.warmup_s = warmup;
            }
            if let Some(duration) = duration_s {
                settings.duration_s = duration;
            }
        }
        self
    }

    /// Switch an axis off; its benchmark reports SKIP with `note`
    pub fn disable(&mut self, axis: ResourceAxis, note: impl Into<String>) {
        self.disabled.insert(axis, note.into());
    }

    pub fn disabled_reason(&self, axis: ResourceAxis) -> Option<&str> {
        self.disabled.get(&axis).map(String::as_str)
    }

    pub fn validate(&self) -> Result<()> {
        for axis in ResourceAxis::ALL {
            let settings = self.for_axis(axis);
            if !settings.warmup_s.is_finite() || !(0.0..=MAX_WINDOW_SECS).contains(&settings.warmup_s) {
                return Err(DoctorError::Config(format!(
                    "benchmarks.{}.warmup_s must be between 0 and {}",
                    axis, MAX_WINDOW_SECS
                )));
            }
            if !settings.duration_s.is_finite()
                || settings.duration_s <= 0.0
                || settings.duration_s > MAX_WINDOW_SECS
            {
                return Err(DoctorError::Config(format!(
                    "benchmarks.{}.duration_s must be positive and at most {}",
                    axis, MAX_WINDOW_SECS
                )));
            }
            if settings.size == 0 || settings.size > max_size(axis) {
                return Err(DoctorError::Config(format!(
                    "benchmarks.{}.size must be between 1 and {}",
                    axis,
                    max_size(axis)
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        assert!(BenchmarkSettings::default().validate().is_ok());
    }

    #[test]
    fn test_window_override() {
        let settings = BenchmarkSettings::default().with_window(Some(0.0), Some(0.25));
        for axis in ResourceAxis::ALL {
            assert_eq!(settings.for_axis(axis).warmup_s, 0.0);
            assert_eq!(settings.for_axis(axis).duration_s, 0.25);
        }
    }

    #[test]
    fn test_invalid_window_rejected() {
        let settings = BenchmarkSettings::default().with_window(None, Some(-1.0));
        assert!(settings.validate().is_err());

        let settings = BenchmarkSettings::default().with_window(None, Some(0.0));
        assert!(settings.validate().is_err());

        let mut settings = BenchmarkSettings::default();
        settings.disk.size = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_oversized_workload_rejected() {
        let mut settings = BenchmarkSettings::default();
        settings.memory.size = 200_000;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("benchmarks.memory.size"));

        let mut settings = BenchmarkSettings::default();
        settings.cpu.size = MAX_MATRIX_EDGE;
        settings.disk.size = MAX_BUFFER_MIB;
        assert!(settings.validate().is_ok());

        settings.gpu.size = MAX_MATRIX_EDGE + 1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_disable_axis() {
        let mut settings = BenchmarkSettings::default();
        settings.disable(ResourceAxis::Gpu, "disabled by --no-gpu");
        assert_eq!(settings.disabled_reason(ResourceAxis::Gpu), Some("disabled by --no-gpu"));
        assert_eq!(settings.disabled_reason(ResourceAxis::Cpu), None);
    }
}
