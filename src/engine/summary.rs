//! Status aggregation and overall verdict

use crate::engine::types::ExecutionResult;
use crate::probes::Status;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-status counts; every status is always present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(rename = "PASS")]
    pub pass: usize,
    #[serde(rename = "WARN")]
    pub warn: usize,
    #[serde(rename = "FAIL")]
    pub fail: usize,
    #[serde(rename = "SKIP")]
    pub skip: usize,
    #[serde(rename = "ERROR")]
    pub error: usize,
}

impl Summary {
    pub fn from_statuses<I: IntoIterator<Item = Status>>(statuses: I) -> Self {
        let mut summary = Self::default();
        for status in statuses {
            match status {
                Status::Pass => summary.pass += 1,
                Status::Warn => summary.warn += 1,
                Status::Fail => summary.fail += 1,
                Status::Skip => summary.skip += 1,
                Status::Error => summary.error += 1,
            }
        }
        summary
    }

    pub fn from_results(results: &[ExecutionResult]) -> Self {
        Self::from_statuses(results.iter().map(ExecutionResult::status))
    }

    pub fn count(&self, status: Status) -> usize {
        match status {
            Status::Pass => self.pass,
            Status::Warn => self.warn,
            Status::Fail => self.fail,
            Status::Skip => self.skip,
            Status::Error => self.error,
        }
    }

    pub fn total(&self) -> usize {
        Status::ALL.iter().map(|s| self.count(*s)).sum()
    }
}

/// Overall health of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallVerdict {
    Healthy,
    Degraded,
    Failed,
}

impl OverallVerdict {
    /// FAIL or ERROR anywhere fails the run; otherwise any WARN degrades it
    pub fn from_summary(summary: &Summary) -> Self {
        if summary.fail > 0 || summary.error > 0 {
            OverallVerdict::Failed
        } else if summary.warn > 0 {
            OverallVerdict::Degraded
        } else {
            OverallVerdict::Healthy
        }
    }

    /// Process exit code for this verdict
    pub fn exit_code(&self) -> i32 {
        match self {
            OverallVerdict::Healthy => 0,
            OverallVerdict::Degraded => 1,
            OverallVerdict::Failed => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallVerdict::Healthy => "healthy",
            OverallVerdict::Degraded => "degraded",
            OverallVerdict::Failed => "failed",
        }
    }
}

impl fmt::Display for OverallVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_total() {
        let summary = Summary::from_statuses([Status::Pass, Status::Fail, Status::Skip, Status::Pass]);
        assert_eq!(summary.pass, 2);
        assert_eq!(summary.fail, 1);
        assert_eq!(summary.skip, 1);
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn test_serialized_key_order() {
        let json = serde_json::to_string(&Summary::default()).unwrap();
        assert_eq!(json, r#"{"PASS":0,"WARN":0,"FAIL":0,"SKIP":0,"ERROR":0}"#);
    }

    #[test]
    fn test_verdicts() {
        let healthy = Summary::from_statuses([Status::Pass, Status::Skip]);
        assert_eq!(OverallVerdict::from_summary(&healthy), OverallVerdict::Healthy);

        let degraded = Summary::from_statuses([Status::Pass, Status::Warn]);
        assert_eq!(OverallVerdict::from_summary(&degraded), OverallVerdict::Degraded);

        let errored = Summary::from_statuses([Status::Warn, Status::Error]);
        assert_eq!(OverallVerdict::from_summary(&errored), OverallVerdict::Failed);
    }

    #[test]
    fn test_empty_run_is_healthy() {
        let verdict = OverallVerdict::from_summary(&Summary::default());
        assert_eq!(verdict, OverallVerdict::Healthy);
        assert_eq!(verdict.exit_code(), 0);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(OverallVerdict::Degraded.exit_code(), 1);
        assert_eq!(OverallVerdict::Failed.exit_code(), 2);
    }
}
