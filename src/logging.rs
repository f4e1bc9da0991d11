//! Tracing subscriber setup
//!
//! Logs go to stderr so `--json` output on stdout stays parseable.

use crate::cli::Verbosity;
use tracing_subscriber::EnvFilter;

/// Default filter directive for a verbosity level
///
/// `configured` (from `[logging] level`) only applies at normal verbosity;
/// explicit `-q`/`-v` flags win.
pub fn default_directive(verbosity: Verbosity, configured: Option<&str>) -> String {
    match verbosity {
        Verbosity::Quiet => "error".to_string(),
        Verbosity::Normal => configured.unwrap_or("warn").to_ascii_lowercase(),
        Verbosity::Verbose => "info".to_string(),
        Verbosity::VeryVerbose => "debug".to_string(),
    }
}

/// Install the global subscriber; `RUST_LOG` overrides the derived level
///
/// Safe to call more than once: later calls are ignored.
pub fn init(verbosity: Verbosity, configured: Option<&str>) {
    let directive = default_directive(verbosity, configured);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directive))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_directives() {
        assert_eq!(default_directive(Verbosity::Quiet, None), "error");
        assert_eq!(default_directive(Verbosity::Normal, None), "warn");
        assert_eq!(default_directive(Verbosity::Verbose, None), "info");
        assert_eq!(default_directive(Verbosity::VeryVerbose, None), "debug");
    }

    #[test]
    fn test_configured_level_only_at_normal() {
        assert_eq!(default_directive(Verbosity::Normal, Some("INFO")), "info");
        assert_eq!(default_directive(Verbosity::Quiet, Some("debug")), "error");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(Verbosity::Quiet, None);
        init(Verbosity::Verbose, None);
    }
}
