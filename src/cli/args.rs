//! Command-line argument parsing for Continuum
//!
//! Provides clap-based CLI with the `doctor` and `profile` subcommands and
//! verbosity control.

use crate::probes::Selector;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Continuum - health diagnostics and bottleneck profiling for ML machines
#[derive(Parser, Debug)]
#[command(name = "continuum")]
#[command(author = "Jerome (Kubashen) Naidoo")]
#[command(version)]
#[command(about = "Diagnose and profile ML compute environments", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only, no spinner)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run environment health checks
    Doctor(DoctorArgs),

    /// Run sustained benchmarks and classify the bottleneck
    Profile(ProfileArgs),
}

/// Unit selection flags shared by both subcommands
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Comma-separated ids or categories to run
    #[arg(long, value_name = "CSV")]
    pub only: Option<String>,

    /// Comma-separated ids or categories to skip
    #[arg(long, value_name = "CSV")]
    pub exclude: Option<String>,

    /// Print the selected units and exit without running them
    #[arg(long)]
    pub list: bool,
}

impl SelectionArgs {
    pub fn selector(&self) -> Selector {
        Selector::from_csv(self.only.as_deref(), self.exclude.as_deref())
    }
}

/// Output flags shared by both subcommands
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Print the report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Do not write a report file
    #[arg(long)]
    pub no_write: bool,

    /// Write the report into DIR instead of the configured report directory
    #[arg(long, value_name = "DIR")]
    pub export: Option<PathBuf>,

    /// Freeze timestamps and durations for reproducible reports
    #[arg(long)]
    pub deterministic: bool,

    /// Per-unit wall-clock timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

impl OutputArgs {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct DoctorArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ProfileArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Skip the GPU benchmark
    #[arg(long)]
    pub no_gpu: bool,

    /// Only capture the static hardware profile
    #[arg(long)]
    pub static_only: bool,

    /// Warm-up seconds for every benchmark
    #[arg(long, value_name = "SECS")]
    pub warmup: Option<f64>,

    /// Measurement seconds for every benchmark
    #[arg(long, value_name = "SECS")]
    pub duration: Option<f64>,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    pub fn selection(&self) -> &SelectionArgs {
        match &self.command {
            Commands::Doctor(args) => &args.selection,
            Commands::Profile(args) => &args.selection,
        }
    }

    pub fn output(&self) -> &OutputArgs {
        match &self.command {
            Commands::Doctor(args) => &args.output,
            Commands::Profile(args) => &args.output,
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Check if should show the progress spinner
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should print per-result details
    pub fn show_details(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}
