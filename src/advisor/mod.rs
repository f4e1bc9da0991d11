//! Remediation Advisor
//!
//! Maps a bottleneck verdict to a ranked, de-duplicated list of actions.
//! The primary axis yields high-priority actions, the secondary axis medium,
//! and any further notable axis low.

use crate::analysis::{BenchmarkMeasurement, BottleneckVerdict, ResourceAxis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Action priority; orders High before Medium before Low
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Priority for the axis at `rank` in the verdict's ordering
    pub fn for_rank(rank: usize) -> Self {
        match rank {
            0 => Priority::High,
            1 => Priority::Medium,
            _ => Priority::Low,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        f.write_str(text)
    }
}

/// One suggested action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationAction {
    pub priority: Priority,
    pub action: String,
    pub rationale: String,
}

/// Ordered actions, high priority first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemediationPlan {
    actions: Vec<RemediationAction>,
}

impl RemediationPlan {
    pub fn actions(&self) -> &[RemediationAction] {
        &self.actions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RemediationAction> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Add an action, or raise the priority of an existing one with the same text
    fn merge(&mut self, priority: Priority, action: &str, rationale: String) {
        match self.actions.iter_mut().find(|a| a.action == action) {
            Some(existing) => existing.priority = existing.priority.min(priority),
            None => self.actions.push(RemediationAction {
                priority,
                action: action.to_string(),
                rationale,
            }),
        }
    }

    fn sort(&mut self) {
        self.actions.sort_by_key(|a| a.priority);
    }
}

/// (action, rationale) pairs
type Template = (&'static str, &'static str);

const DATALOADER_WORKERS: Template = (
    "Increase DataLoader worker processes and enable prefetching",
    "input pipeline stalls starve the accelerator",
);

const GPU_ACTIONS: &[Template] = &[
    (
        "Enable mixed precision (FP16/BF16) training",
        "half-precision matmuls use tensor cores and halve memory traffic",
    ),
    (
        "Check for thermal or power throttling with nvidia-smi -q -d PERFORMANCE",
        "throttled clocks cap sustained throughput",
    ),
    (
        "Enable GPU persistence mode (nvidia-smi -pm 1)",
        "avoids driver re-initialisation latency between jobs",
    ),
];

const CPU_ACTIONS: &[Template] = &[
    (
        "Set the CPU frequency governor to performance",
        "power-saving governors reduce sustained clock speed",
    ),
    DATALOADER_WORKERS,
];

const MEMORY_ACTIONS: &[Template] = &[
    (
        "Use pinned (page-locked) host memory for host-to-device transfers",
        "pinned buffers allow DMA without an extra copy",
    ),
    (
        "Reduce per-process memory footprint or batch size",
        "memory pressure forces swapping and cache thrashing",
    ),
];

const DISK_ACTIONS: &[Template] = &[
    (
        "Move datasets to faster local storage (NVMe SSD)",
        "dataset reads are limited by storage throughput",
    ),
    (
        "Cache or pre-shard the dataset in memory or a local scratch directory",
        "repeated epochs re-read the same data",
    ),
    DATALOADER_WORKERS,
];

const MISSING_GPU_BACKEND: Template = (
    "Install a GPU backend (CUDA or Metal) to include accelerator throughput in the analysis",
    "the GPU axis could not be measured",
);

fn templates(axis: ResourceAxis) -> &'static [Template] {
    match axis {
        ResourceAxis::Gpu => GPU_ACTIONS,
        ResourceAxis::Cpu => CPU_ACTIONS,
        ResourceAxis::Memory => MEMORY_ACTIONS,
        ResourceAxis::Disk => DISK_ACTIONS,
    }
}

/// Remediation generator
#[derive(Debug, Clone, Default)]
pub struct RemediationAdvisor;

impl RemediationAdvisor {
    pub fn new() -> Self {
        Self
    }

    /// Build the plan for a verdict
    ///
    /// `measurements` is only consulted to notice a GPU axis that was not
    /// measured because no backend was available.
    pub fn plan(
        &self,
        verdict: &BottleneckVerdict,
        measurements: &BTreeMap<ResourceAxis, BenchmarkMeasurement>,
    ) -> RemediationPlan {
        let mut plan = RemediationPlan::default();

        for (rank, score) in verdict.scores.iter().enumerate() {
            if !score.notable {
                continue;
            }

            let priority = Priority::for_rank(rank);
            for (action, rationale) in templates(score.axis) {
                let rationale = match &score.reason {
                    Some(reason) => format!("{}; {}", reason, rationale),
                    None => rationale.to_string(),
                };
                plan.merge(priority, action, rationale);
            }
        }

        let gpu_unmeasured = measurements
            .get(&ResourceAxis::Gpu)
            .map_or(false, |m| !m.backend_available);
        if gpu_unmeasured {
            let (action, rationale) = MISSING_GPU_BACKEND;
            plan.merge(Priority::Low, action, rationale.to_string());
        }

        plan.sort();
        plan
    }
}
