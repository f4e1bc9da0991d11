//! Continuum - Main CLI Entry Point

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use continuum::cli::{Args, Commands, OutputArgs, Verbosity};
use continuum::config::Config;
use continuum::errors::{exit_code_for, EXIT_TOOL_CRASH};
use continuum::execution::{run_doctor, run_profile, RunOptions};
use continuum::probes::ProbeListing;
use continuum::profiler::StaticProfile;
use continuum::report::{render_listing, render_report, EnvironmentSnapshot, Report, ReportWriter};
use continuum::{doctor, logging, profiler};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let code = match tokio::spawn(run(args)).await {
        Ok(Ok(code)) => code,
        Ok(Err(err)) => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            exit_code_for(&err)
        }
        Err(join_err) => {
            eprintln!("{} internal failure: {}", "Error:".red().bold(), join_err);
            EXIT_TOOL_CRASH
        }
    };

    std::process::exit(code);
}

/// Run one invocation and return its exit code
async fn run(args: Args) -> Result<i32> {
    let config = Config::load(args.config.as_deref())?;
    let verbosity = args.verbosity();
    logging::init(verbosity, config.logging.level.as_deref());

    let registry = match &args.command {
        Commands::Doctor(_) => doctor::builtin_registry()?,
        Commands::Profile(_) => profiler::builtin_registry()?,
    };

    let selection = args.selection();
    let selector = selection.selector();

    if selection.list {
        let listing: Vec<ProbeListing> = selector
            .resolve(&registry)?
            .into_iter()
            .map(ProbeListing::from)
            .collect();
        print!("{}", render_listing(&listing));
        return Ok(0);
    }

    let output = args.output();
    let options = RunOptions::from_config(&config)
        .with_deterministic(output.deterministic)
        .with_timeout(output.timeout());
    let environment = EnvironmentSnapshot::capture();

    let report = match &args.command {
        Commands::Doctor(_) => {
            let spinner = start_spinner(verbosity, "Running health checks...");
            let report = run_doctor(&registry, &selector, &options, environment).await;
            finish_spinner(spinner);
            report?
        }
        Commands::Profile(profile) => {
            let mut options = options.with_window(profile.warmup, profile.duration);
            if profile.no_gpu {
                options = options.without_gpu();
            }
            if profile.static_only {
                options = options.static_only();
            }

            let spinner = start_spinner(verbosity, "Profiling...");
            let static_profile = StaticProfile::capture();
            let report = run_profile(&registry, &selector, &options, environment, static_profile).await;
            finish_spinner(spinner);
            report?
        }
    };

    emit(&report, output, verbosity, &config)?;
    Ok(report.exit_code())
}

/// Spinner on stderr while units execute
fn start_spinner(verbosity: Verbosity, message: &str) -> Option<ProgressBar> {
    if !verbosity.show_progress() {
        return None;
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Some(spinner)
}

fn finish_spinner(spinner: Option<ProgressBar>) {
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
}

/// Print the report and persist it
///
/// Serialization happens before anything is printed, so a serialization
/// failure leaves no partial output behind.
fn emit(report: &Report, output: &OutputArgs, verbosity: Verbosity, config: &Config) -> Result<()> {
    let json = report.to_json_pretty()?;

    if output.json {
        print!("{}", json);
    } else {
        print!("{}", render_report(report, verbosity.show_details()));
    }

    let writer = if output.no_write {
        ReportWriter::disabled()
    } else {
        ReportWriter::new(
            output
                .export
                .clone()
                .unwrap_or_else(|| config.doctor.report_dir.clone()),
        )
    };

    if let Some(path) = writer.write(report)? {
        if verbosity.show_progress() {
            eprintln!("{} {}", "Report written to".dimmed(), path.display());
        }
    }

    Ok(())
}
