//! Execution engine
//!
//! Runs selected probes one at a time in registry order. Each probe body runs
//! on a blocking worker under a timeout; whatever happens inside it, the run
//! carries on and the failure is recorded as an `ERROR` outcome.

use crate::engine::clock::RunClock;
use crate::engine::types::{ExecutionResult, ExecutionRun};
use crate::probes::{ProbeContext, ProbeDefinition, RawOutcome, Status};
use std::any::Any;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Default per-probe timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(120);

/// Message recorded for a probe whose gate said no
pub const SKIPPED_MESSAGE: &str = "Check skipped";

/// Sequential probe runner
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    clock: RunClock,
    timeout: Duration,
}

impl ExecutionEngine {
    pub fn new(clock: RunClock) -> Self {
        Self {
            clock,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Set per-probe timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn clock(&self) -> RunClock {
        self.clock
    }

    /// Run every unit and return one result per unit, in order
    pub async fn run(&self, units: &[&ProbeDefinition], mut ctx: ProbeContext) -> ExecutionRun {
        let mut results = Vec::with_capacity(units.len());
        let mut total_duration_ms = 0.0;

        info!(count = units.len(), "running probes");

        for definition in units {
            let started_at = self.clock.timestamp();
            let started = self.clock.start();

            let mut outcome = if definition.should_run(&ctx) {
                debug!(probe = %definition.id, "probe started");
                self.invoke(definition, &ctx).await
            } else {
                debug!(probe = %definition.id, "probe gated off");
                RawOutcome::skip(SKIPPED_MESSAGE)
            };

            outcome.duration_ms = self.clock.elapsed_ms(started);
            total_duration_ms += outcome.duration_ms;

            match outcome.status {
                Status::Error => warn!(probe = %definition.id, message = %outcome.message, "probe errored"),
                status => debug!(probe = %definition.id, status = %status, "probe finished"),
            }

            ctx.record(&definition.id, outcome.status, &outcome.facts);
            results.push(ExecutionResult::new(definition, outcome, started_at));
        }

        ExecutionRun {
            results,
            total_duration_ms,
            context: ctx,
        }
    }

    async fn invoke(&self, definition: &ProbeDefinition, ctx: &ProbeContext) -> RawOutcome {
        let probe = definition.probe();
        let snapshot = ctx.clone();
        let handle = tokio::task::spawn_blocking(move || probe.run(&snapshot));

        match timeout(self.timeout, handle).await {
            Ok(Ok(Ok(outcome))) => outcome,
            Ok(Ok(Err(err))) => RawOutcome::error(format!("Probe failed: {:#}", err)),
            Ok(Err(join_err)) => RawOutcome::error(describe_join_error(join_err)),
            Err(_) => RawOutcome::error(format!(
                "Probe timed out after {}s",
                self.timeout.as_secs_f64()
            )),
        }
    }
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_panic() {
        format!("Probe panicked: {}", panic_message(err.into_panic()))
    } else {
        "Probe was cancelled".to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
