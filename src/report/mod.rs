//! Report building, persistence and rendering

pub mod builder;
pub mod environment;
pub mod render;
pub mod types;
pub mod writer;

pub use builder::ReportBuilder;
pub use environment::EnvironmentSnapshot;
pub use render::{render_listing, render_report};
pub use types::{Report, ReportKind, SCHEMA_VERSION};
pub use writer::{ReportWriter, DEFAULT_REPORT_DIR};
