//! Human-readable terminal rendering

use crate::engine::{ExecutionResult, OverallVerdict};
use crate::probes::{ProbeListing, Status};
use crate::report::types::{Report, ReportKind};
use colored::*;
use std::fmt::Write;

fn status_label(status: Status) -> ColoredString {
    let label = format!("{:<5}", status.as_str());
    match status {
        Status::Pass => label.green(),
        Status::Warn => label.yellow(),
        Status::Fail => label.red(),
        Status::Skip => label.dimmed(),
        Status::Error => label.magenta().bold(),
    }
}

fn verdict_label(verdict: OverallVerdict) -> ColoredString {
    match verdict {
        OverallVerdict::Healthy => verdict.as_str().green().bold(),
        OverallVerdict::Degraded => verdict.as_str().yellow().bold(),
        OverallVerdict::Failed => verdict.as_str().red().bold(),
    }
}

fn render_result(out: &mut String, result: &ExecutionResult, verbose: bool) {
    let _ = writeln!(
        out,
        "  {} {:<32} {}",
        status_label(result.status()),
        result.id,
        result.outcome.message
    );

    if matches!(result.status(), Status::Warn | Status::Fail | Status::Error) {
        for step in result.outcome.remediation.iter().flatten() {
            let _ = writeln!(out, "        {} {}", "->".cyan(), step);
        }
    }

    if verbose && !result.outcome.details.is_empty() {
        for (key, value) in &result.outcome.details {
            let _ = writeln!(out, "        {}: {}", key.dimmed(), value);
        }
    }
}

/// Render a report as colored text
pub fn render_report(report: &Report, verbose: bool) -> String {
    let mut out = String::new();
    let title = match report.kind {
        ReportKind::Doctor => "Environment Health Check",
        ReportKind::Profile => "Performance Profile",
    };

    let _ = writeln!(out, "\n{}", title.bold().cyan());
    let _ = writeln!(
        out,
        "{}",
        format!(
            "{} | {} | {} | {} CPUs",
            report.environment.hostname,
            report.environment.os,
            report.environment.arch,
            report.environment.logical_cpus
        )
        .dimmed()
    );
    let _ = writeln!(out, "{}", "=".repeat(64).cyan());

    for result in report.results() {
        render_result(&mut out, result, verbose);
    }

    if let Some(verdict) = &report.analysis {
        let _ = writeln!(out, "\n{}", "Bottleneck Analysis".bold());
        match verdict.primary {
            Some(primary) => {
                let secondary = verdict
                    .secondary
                    .map(|axis| axis.to_string())
                    .unwrap_or_else(|| "none".to_string());
                let _ = writeln!(
                    out,
                    "  primary: {}  secondary: {}  confidence: {:.3}",
                    primary.to_string().bold(),
                    secondary,
                    verdict.confidence
                );
            }
            None => {
                let _ = writeln!(out, "  {}", "no axis could be scored".dimmed());
            }
        }
        for reason in &verdict.reasons {
            let _ = writeln!(out, "  - {}", reason);
        }
    }

    if let Some(plan) = report.remediation.as_ref().filter(|p| !p.is_empty()) {
        let _ = writeln!(out, "\n{}", "Recommendations".bold());
        for action in plan.iter() {
            let _ = writeln!(out, "  [{:<6}] {}", action.priority.to_string(), action.action);
        }
    }

    let summary = &report.summary;
    let _ = writeln!(out, "\n{}", "=".repeat(64).cyan());
    let _ = writeln!(
        out,
        "  {} pass, {} warn, {} fail, {} skip, {} error",
        summary.pass.to_string().green(),
        summary.warn.to_string().yellow(),
        summary.fail.to_string().red(),
        summary.skip,
        summary.error.to_string().magenta()
    );
    let _ = writeln!(out, "  Overall: {}", verdict_label(report.overall_status));

    out
}

/// Render `--list` output: one `id<TAB>category<TAB>title` line per unit
pub fn render_listing(listing: &[ProbeListing]) -> String {
    let mut out = String::new();
    for entry in listing {
        let _ = writeln!(out, "{}\t{}\t{}", entry.id, entry.category, entry.title);
    }
    out
}
