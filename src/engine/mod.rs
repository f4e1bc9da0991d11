//! Probe execution engine
//! Sequential runner, run clock and status aggregation

pub mod clock;
pub mod executor;
pub mod summary;
pub mod types;

pub use clock::{RunClock, EPOCH_SENTINEL};
pub use executor::{ExecutionEngine, DEFAULT_PROBE_TIMEOUT, SKIPPED_MESSAGE};
pub use summary::{OverallVerdict, Summary};
pub use types::{ExecutionResult, ExecutionRun};
