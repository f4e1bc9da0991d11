//! Python and runtime environment checks

use crate::doctor::command;
use crate::probes::{ProbeContext, RawOutcome};
use serde_json::json;

/// Oldest supported Python (major, minor)
pub const MIN_PYTHON: (u32, u32) = (3, 10);

const VERSION_SCRIPT: &str = "import sys; print('%d.%d.%d' % sys.version_info[:3])";

/// Parse `3.11.4` into its numeric parts
pub fn parse_python_version(text: &str) -> Option<(u32, u32, u32)> {
    let mut parts = text.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let micro = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    Some((major, minor, micro))
}

pub fn python_version(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    let minimum = format!("{}.{}", MIN_PYTHON.0, MIN_PYTHON.1);

    let Some(python) = command::python_interpreter() else {
        return Ok(RawOutcome::fail("No Python interpreter found on PATH.")
            .with_detail("minimum", minimum)
            .with_remediation([
                "Install Python 3.10 or newer.",
                "Create and activate a virtual environment with: python3.10 -m venv .venv",
            ]));
    };

    let captured = command::run(&python, &["-c", VERSION_SCRIPT])?;
    let Some((major, minor, micro)) = captured.first_line().and_then(parse_python_version) else {
        anyhow::bail!("could not parse Python version from {:?}", captured.first_line());
    };

    let current = format!("{}.{}.{}", major, minor, micro);
    let path = python.display().to_string();

    if (major, minor) < MIN_PYTHON {
        return Ok(RawOutcome::fail("Python 3.10+ is required.")
            .with_detail("current", current)
            .with_detail("minimum", minimum)
            .with_detail("executable", path.clone())
            .with_remediation([
                "Install Python 3.10 or newer.",
                "Create and activate a virtual environment with: python3.10 -m venv .venv",
                "Activate it with: source .venv/bin/activate",
            ])
            .with_fact("python_executable", path));
    }

    Ok(RawOutcome::pass("Python version is supported.")
        .with_detail("current", current)
        .with_detail("minimum", minimum)
        .with_detail("executable", path.clone())
        .with_fact("python_executable", path))
}

/// Isolation markers read from the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvMarkers {
    pub virtual_env: Option<String>,
    pub conda_prefix: Option<String>,
    pub conda_default_env: Option<String>,
}

impl EnvMarkers {
    pub fn from_env() -> Self {
        let read = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        Self {
            virtual_env: read("VIRTUAL_ENV"),
            conda_prefix: read("CONDA_PREFIX"),
            conda_default_env: read("CONDA_DEFAULT_ENV"),
        }
    }

    pub fn isolated(&self) -> bool {
        self.virtual_env.is_some() || self.conda_prefix.is_some() || self.conda_default_env.is_some()
    }
}

pub fn venv_outcome(markers: &EnvMarkers) -> RawOutcome {
    let outcome = if markers.isolated() {
        RawOutcome::pass("Python environment is isolated (venv/conda).")
    } else {
        RawOutcome::warn("Running on system Python; isolation is recommended.").with_remediation([
            "Create a virtual environment: python3 -m venv .venv",
            "Activate it: source .venv/bin/activate",
        ])
    };

    outcome
        .with_detail("in_venv", markers.isolated())
        .with_detail("virtual_env", json!(markers.virtual_env))
        .with_detail("conda_prefix", json!(markers.conda_prefix))
        .with_detail("conda_default_env", json!(markers.conda_default_env))
}

pub fn venv(_ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    Ok(venv_outcome(&EnvMarkers::from_env()))
}

pub fn runtime(ctx: &ProbeContext) -> anyhow::Result<RawOutcome> {
    Ok(RawOutcome::pass("Runtime environment detected.")
        .with_detail("is_container", ctx.is_container)
        .with_detail("is_wsl", ctx.is_wsl)
        .with_detail("os", std::env::consts::OS)
        .with_detail("arch", std::env::consts::ARCH))
}
