//! Probe model, registry and selection

pub mod registry;
pub mod selector;
pub mod types;

pub use registry::{ProbeListing, ProbeRegistry};
pub use selector::Selector;
pub use types::{
    Gate, Probe, ProbeContext, ProbeDefinition, ProbeKind, RawOutcome, Status, MAX_SEVERITY,
};
