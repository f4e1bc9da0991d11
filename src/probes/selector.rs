//! Probe selection from `--only` / `--exclude` tokens
//!
//! A token matches a probe when it equals the probe's id or its category.

use crate::errors::{DoctorError, Result};
use crate::probes::registry::ProbeRegistry;
use crate::probes::types::ProbeDefinition;
use std::collections::BTreeSet;

/// Include and exclude token sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

impl Selector {
    /// Build from token lists; tokens are trimmed and empty ones dropped
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            include: normalize(include),
            exclude: normalize(exclude),
        }
    }

    /// Build from comma-separated CLI values
    pub fn from_csv(only: Option<&str>, exclude: Option<&str>) -> Self {
        let split = |value: Option<&str>| -> Vec<String> {
            value
                .map(|v| v.split(',').map(str::to_string).collect())
                .unwrap_or_default()
        };
        Self::new(split(only), split(exclude))
    }

    /// Selector that keeps every probe
    pub fn all() -> Self {
        Self::default()
    }

    pub fn include(&self) -> &BTreeSet<String> {
        &self.include
    }

    pub fn exclude(&self) -> &BTreeSet<String> {
        &self.exclude
    }

    /// Resolve the selection against a registry
    ///
    /// Every token is checked first; any token matching neither an id nor a
    /// category fails the whole selection. The survivors keep registry order.
    pub fn resolve<'r>(&self, registry: &'r ProbeRegistry) -> Result<Vec<&'r ProbeDefinition>> {
        let unknown: BTreeSet<String> = self
            .include
            .iter()
            .chain(self.exclude.iter())
            .filter(|token| !registry.contains_id(token) && !registry.contains_category(token))
            .cloned()
            .collect();

        if !unknown.is_empty() {
            return Err(DoctorError::UnknownSelector {
                tokens: unknown.into_iter().collect(),
            });
        }

        let selected = registry
            .all()
            .iter()
            .filter(|p| self.include.is_empty() || matches(&self.include, p))
            .filter(|p| !matches(&self.exclude, p))
            .collect();

        Ok(selected)
    }
}

fn matches(tokens: &BTreeSet<String>, probe: &ProbeDefinition) -> bool {
    tokens.contains(&probe.id) || tokens.contains(&probe.category)
}

fn normalize<I, S>(tokens: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
