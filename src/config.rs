//! TOML configuration
//!
//! Every section is optional; missing keys fall back to the built-in
//! defaults. Command-line flags are applied on top by `main`.

use crate::analysis::ClassifierConfig;
use crate::errors::{DoctorError, Result};
use crate::profiler::BenchmarkSettings;
use crate::report::DEFAULT_REPORT_DIR;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Accepted values for `[logging] level`
pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub doctor: DoctorConfig,
    pub logging: LoggingConfig,
    pub benchmarks: BenchmarkSettings,
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoctorConfig {
    /// Directory reports are written into
    pub report_dir: PathBuf,

    /// Hard wall-clock limit for a single probe
    pub probe_timeout_secs: u64,
}

impl Default for DoctorConfig {
    fn default() -> Self {
        Self {
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
            probe_timeout_secs: 120,
        }
    }
}

impl DoctorConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when neither -v/-q nor RUST_LOG is given
    pub level: Option<String>,
}

impl Config {
    /// Load from `path`, or from the default location
    ///
    /// An explicit path must exist. A missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::config_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(DoctorError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| DoctorError::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| DoctorError::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Default configuration file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".continuum").join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.doctor.probe_timeout_secs == 0 {
            return Err(DoctorError::Config(
                "doctor.probe_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if let Some(level) = &self.logging.level {
            if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
                return Err(DoctorError::Config(format!(
                    "logging.level '{}' is not one of {}",
                    level,
                    LOG_LEVELS.join(", ")
                )));
            }
        }

        self.benchmarks.validate()?;
        self.classifier.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ResourceAxis;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.doctor.report_dir, PathBuf::from(".hydra/reports"));
        assert_eq!(config.doctor.probe_timeout(), Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [doctor]
            probe_timeout_secs = 30

            [benchmarks.cpu]
            warmup_s = 0.0
            duration_s = 1.0
            size = 128

            [classifier.disk]
            value = 250.0
            unit = "MB/s"
            "#,
        )
        .unwrap();

        assert_eq!(config.doctor.probe_timeout_secs, 30);
        assert_eq!(config.doctor.report_dir, PathBuf::from(".hydra/reports"));
        assert_eq!(config.benchmarks.cpu.size, 128);
        assert_eq!(config.benchmarks.gpu.size, 4096);
        assert_eq!(config.classifier.baseline(ResourceAxis::Disk).value, 250.0);
        assert!(config.classifier.baseline(ResourceAxis::Disk).higher_is_better);
        assert_eq!(config.classifier.baseline(ResourceAxis::Cpu).value, 50.0);
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.doctor.probe_timeout_secs = 45;
        config.logging.level = Some("debug".to_string());
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("absent.toml");
        assert!(matches!(Config::load(Some(&missing)), Err(DoctorError::Config(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.doctor.probe_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = Some("chatty".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.classifier.gap_weight = 1.5;
        assert!(config.validate().is_err());
    }
}
