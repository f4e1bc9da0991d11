//! Error types for Continuum
//!
//! Only selection-time, configuration and serialization failures travel to the
//! invocation boundary. Failures inside a single probe never show up here: the
//! engine folds them into an `ERROR` outcome.

use thiserror::Error;

/// Process exit code for an invalid `--only` / `--exclude` selection
pub const EXIT_INVALID_INPUT: i32 = 3;

/// Process exit code for a failure outside any single probe
pub const EXIT_TOOL_CRASH: i32 = 4;

/// Main error type for the diagnostics core
#[derive(Error, Debug)]
pub enum DoctorError {
    /// A probe id was registered twice
    #[error("Duplicate probe id: {0}")]
    DuplicateProbeId(String),

    /// A probe id does not follow the dotted `category.name` form
    #[error("Invalid probe id '{0}': expected dotted form category.name")]
    InvalidProbeId(String),

    /// Include/exclude tokens that match no id or category
    #[error("Unknown selector(s): {}", tokens.join(", "))]
    UnknownSelector { tokens: Vec<String> },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

impl DoctorError {
    /// Exit code this error maps to at the process boundary
    pub fn exit_code(&self) -> i32 {
        match self {
            DoctorError::UnknownSelector { .. } => EXIT_INVALID_INPUT,
            _ => EXIT_TOOL_CRASH,
        }
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, DoctorError>;

/// Convert anyhow errors to DoctorError
impl From<anyhow::Error> for DoctorError {
    fn from(err: anyhow::Error) -> Self {
        DoctorError::Generic(format!("{:#}", err))
    }
}

/// Exit code for an error that reached `main`
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<DoctorError>()
        .map(DoctorError::exit_code)
        .unwrap_or(EXIT_TOOL_CRASH)
}
