//! Probe registry
//!
//! Append-only catalogue of probe definitions. Registration order is the
//! canonical execution order.

use crate::errors::{DoctorError, Result};
use crate::probes::types::{ProbeDefinition, ProbeKind};
use serde::Serialize;
use std::collections::HashSet;

/// One row of `--list` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeListing {
    pub id: String,
    pub category: String,
    pub title: String,
    pub kind: ProbeKind,
}

impl From<&ProbeDefinition> for ProbeListing {
    fn from(definition: &ProbeDefinition) -> Self {
        Self {
            id: definition.id.clone(),
            category: definition.category.clone(),
            title: definition.title.clone(),
            kind: definition.kind,
        }
    }
}

/// Registry of probe definitions
#[derive(Debug, Clone, Default)]
pub struct ProbeRegistry {
    /// Definitions in registration order
    probes: Vec<ProbeDefinition>,

    /// Ids seen so far
    ids: HashSet<String>,
}

impl ProbeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a probe
    ///
    /// Fails on a repeated id or an id without a dotted `category.name` form.
    pub fn register(&mut self, definition: ProbeDefinition) -> Result<()> {
        if !is_dotted_id(&definition.id) {
            return Err(DoctorError::InvalidProbeId(definition.id));
        }

        if self.ids.contains(&definition.id) {
            return Err(DoctorError::DuplicateProbeId(definition.id));
        }

        self.ids.insert(definition.id.clone());
        self.probes.push(definition);
        Ok(())
    }

    /// All definitions in registration order
    pub fn all(&self) -> &[ProbeDefinition] {
        &self.probes
    }

    /// Get a definition by id
    pub fn get(&self, id: &str) -> Option<&ProbeDefinition> {
        self.probes.iter().find(|p| p.id == id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.probes.iter().any(|p| p.category == category)
    }

    /// Id, category and title of every probe, in registration order
    pub fn list_for_display(&self) -> Vec<ProbeListing> {
        self.probes.iter().map(ProbeListing::from).collect()
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

fn is_dotted_id(id: &str) -> bool {
    match id.split_once('.') {
        Some((category, name)) => !category.is_empty() && !name.is_empty() && !id.contains(char::is_whitespace),
        None => false,
    }
}
