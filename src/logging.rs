//! Tracing setup for the command line
//!
//! Diagnostics go to stderr so stdout stays free for the resulting style or
//! JSON events. `STYLEFIT_LOG` overrides the level picked from the flags.

use std::fs::File;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const ENV_VAR: &str = "STYLEFIT_LOG";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// How much of the search to log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    /// Per-option decisions and oracle batches
    Verbose,
    Debug,
}

impl Verbosity {
    /// `--debug` wins over `--quiet`, which wins over `--verbose`
    pub fn from_flags(debug: bool, verbose: bool, quiet: bool) -> Self {
        if debug {
            Self::Debug
        } else if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "stylefit=error",
            // Progress already reaches the console through the output handler
            Self::Normal => "stylefit=warn",
            Self::Verbose => "stylefit=info",
            Self::Debug => "stylefit=debug",
        }
    }
}

/// Logging settings assembled from the global flags
#[derive(Debug, Clone)]
pub struct LogOptions {
    pub verbosity: Verbosity,
    /// Emit stderr records as JSON, matching `--json` event output
    pub json: bool,
    pub log_file: Option<PathBuf>,
}

/// Install the global subscriber
pub fn init_logging(options: &LogOptions) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env(ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(options.verbosity.directive()));
    let debug = options.verbosity == Verbosity::Debug;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if options.json {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(
            fmt::layer()
                .with_target(false)
                .with_line_number(debug)
                .with_file(debug)
                .with_writer(std::io::stderr)
                .boxed(),
        );
    }

    if let Some(path) = &options.log_file {
        let file = open_log_file(path)?;
        layers.push(
            fmt::layer()
                .with_ansi(false)
                .with_writer(file)
                .with_target(true)
                .with_line_number(true)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .init();

    Ok(())
}

/// Open `path` for appending, creating its directory first
fn open_log_file(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?)
}

/// Default log file for a command: `~/.config/stylefit/logs/<command>-<timestamp>.log`
pub fn default_log_path(command: &str) -> anyhow::Result<PathBuf> {
    let log_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("stylefit")
        .join("logs");

    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    Ok(log_dir.join(format!("{}-{}.log", command, timestamp)))
}
