//! Continuum - ML environment diagnostics and profiling
//!
//! Health checks and sustained benchmarks for machine-learning hosts, with
//! bottleneck classification and remediation on top.
//!
//! # Architecture
//!
//! - **probes**: probe model, registry and selector
//! - **engine**: sequential execution, deterministic clock, status aggregation
//! - **analysis** / **advisor**: bottleneck classification and remediation
//! - **doctor** / **profiler**: built-in checks and benchmarks
//! - **report**: report assembly, persistence and rendering

pub mod errors;
pub mod probes;
pub mod engine;
pub mod analysis;
pub mod advisor;
pub mod report;

// Built-in units
pub mod doctor;
pub mod profiler;

// Interface layer
pub mod cli;
pub mod config;
pub mod logging;
pub mod execution;

// Re-export commonly used types
pub use errors::{DoctorError, Result};
