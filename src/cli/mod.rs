//! CLI module for Continuum
//!
//! Handles command-line argument parsing.

pub mod args;

pub use args::{Args, Commands, DoctorArgs, OutputArgs, ProfileArgs, SelectionArgs, Verbosity};
