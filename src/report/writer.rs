//! Report persistence
//!
//! Reports land in `<dir>/<kind>_YYYYmmdd_HHMMSS.json`. Each report is staged
//! in a temp file and moved into place without clobbering; a name collision
//! gets a numeric suffix.

use crate::errors::{DoctorError, Result};
use crate::report::types::Report;
use chrono::Local;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Default report directory, relative to the working directory
pub const DEFAULT_REPORT_DIR: &str = ".hydra/reports";

const MAX_SUFFIX: u32 = 1000;

/// Writes reports to disk
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
    enabled: bool,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            enabled: true,
        }
    }

    /// Writer that never touches the filesystem (`--no-write`)
    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_REPORT_DIR),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a report; `Ok(None)` when writing is disabled
    pub fn write(&self, report: &Report) -> Result<Option<PathBuf>> {
        if !self.enabled {
            debug!("report writing disabled");
            return Ok(None);
        }
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        self.write_stamped(report, &stamp).map(Some)
    }

    pub(crate) fn write_stamped(&self, report: &Report, stamp: &str) -> Result<PathBuf> {
        let json = report.to_json_pretty()?;
        self.persist_with(report.kind.file_prefix(), stamp, |file| file.write_all(json.as_bytes()))
    }

    /// Fill a temp file in the report directory, then move it to a free name
    fn persist_with<F>(&self, prefix: &str, stamp: &str, fill: F) -> Result<PathBuf>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        fs::create_dir_all(&self.dir)?;

        let mut staged = NamedTempFile::new_in(&self.dir)?;
        fill(staged.as_file_mut())?;
        staged.as_file().sync_all()?;

        for attempt in 0..MAX_SUFFIX {
            let name = match attempt {
                0 => format!("{}_{}.json", prefix, stamp),
                n => format!("{}_{}_{}.json", prefix, stamp, n),
            };
            let path = self.dir.join(name);

            match staged.persist_noclobber(&path) {
                Ok(_) => {
                    info!(path = %path.display(), "report written");
                    return Ok(path);
                }
                Err(err) if err.error.kind() == ErrorKind::AlreadyExists => staged = err.file,
                Err(err) => return Err(err.error.into()),
            }
        }

        Err(DoctorError::Generic(format!(
            "could not find a free report file name in {}",
            self.dir.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RunClock;
    use crate::report::builder::ReportBuilder;
    use crate::report::environment::EnvironmentSnapshot;
    use tempfile::TempDir;

    fn report() -> Report {
        ReportBuilder::doctor(RunClock::Frozen, EnvironmentSnapshot::capture()).build()
    }

    #[test]
    fn test_collision_gets_suffix() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path().join("reports"));

        let first = writer.write_stamped(&report(), "20240101_120000").unwrap();
        let second = writer.write_stamped(&report(), "20240101_120000").unwrap();

        assert_eq!(first.file_name().unwrap(), "doctor_20240101_120000.json");
        assert_eq!(second.file_name().unwrap(), "doctor_20240101_120000_1.json");
        assert_eq!(fs::read_to_string(&first).unwrap(), fs::read_to_string(&second).unwrap());
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path());

        let result = writer.persist_with("doctor", "20240101_120000", |file| {
            file.write_all(b"{\"partial\":")?;
            Err(io::Error::new(ErrorKind::Other, "disk full"))
        });

        assert!(result.is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_no_staging_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path());
        writer.write_stamped(&report(), "20240101_120000").unwrap();
        writer.write_stamped(&report(), "20240101_120000").unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["doctor_20240101_120000.json", "doctor_20240101_120000_1.json"]);
    }

    #[test]
    fn test_disabled_writer_writes_nothing() {
        let writer = ReportWriter::disabled();
        assert!(writer.write(&report()).unwrap().is_none());
    }

    #[test]
    fn test_write_uses_prefix() {
        let dir = TempDir::new().unwrap();
        let path = ReportWriter::new(dir.path()).write(&report()).unwrap().unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("doctor_"));
        assert!(name.ends_with(".json"));

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["schema_version"], "1.0.0");
    }
}
