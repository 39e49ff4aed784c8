mod cache;
mod cli;
mod config;
mod logging;
mod oracle;
mod process;
mod sample;
mod search;
mod style;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::{OutputEvent, OutputMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stylefit")]
#[command(about = "Infer a .clang-format style from existing source code")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Source files whose formatting the style should reproduce
    inputs: Vec<PathBuf>,

    /// Where to write the resulting style
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// clang-format executable
    #[arg(long = "clang-format", value_name = "PATH")]
    clang_format: Option<String>,

    /// diff executable
    #[arg(long, value_name = "PATH")]
    diff: Option<String>,

    /// Option list to search
    #[arg(long, value_name = "PATH")]
    options: Option<PathBuf>,

    /// Directory for the source sample and cached artifacts
    #[arg(long, value_name = "PATH")]
    dump_dir: Option<PathBuf>,

    /// Max concurrent formatter/diff processes
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Print every candidate's score
    #[arg(short, long)]
    verbose: bool,

    /// Keep artifacts in memory instead of the dump directory
    #[arg(long)]
    no_cache: bool,

    /// Project directory for `.stylefit/config.toml` (defaults to current)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress normal output
    #[arg(long, global = true)]
    quiet: bool,

    /// Emit JSON events instead of console output
    #[arg(long, global = true)]
    json: bool,

    /// Also log to a file (default location if no path is given)
    #[arg(long, global = true, value_name = "PATH", num_args = 0..=1)]
    log_file: Option<Option<PathBuf>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the formatter and diff programs are available
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let command_name = match cli.command {
        Some(Commands::Doctor) => "doctor",
        None => "infer",
    };
    let log_file = match cli.log_file {
        Some(Some(path)) => Some(path),
        Some(None) => Some(logging::default_log_path(command_name)?),
        None => None,
    };
    logging::init_logging(&logging::LogOptions {
        verbosity: logging::Verbosity::from_flags(cli.debug, cli.verbose, cli.quiet),
        json: cli.json,
        log_file,
    })?;

    let mut config = config::StylefitConfig::load(cli.dir.as_deref())?;
    if let Some(out) = cli.out {
        config.search.output = out;
    }
    if let Some(options) = cli.options {
        config.search.options = options;
    }
    if let Some(dump_dir) = cli.dump_dir {
        config.search.dump_dir = dump_dir;
    }
    if let Some(jobs) = cli.jobs {
        config.search.max_concurrent = Some(jobs);
    }
    if let Some(command) = cli.clang_format {
        config.formatter.command = command;
    }
    if let Some(command) = cli.diff {
        config.diff.command = command;
    }
    let config = config.expand_paths();

    let mode = OutputMode::from_flags(cli.json, cli.quiet);
    let handler = cli::create_handler(mode, cli.verbose, cli.debug);

    let code = match cli.command {
        Some(Commands::Doctor) => cli::doctor(&config, &*handler).await,
        None => match cli::infer(&cli.inputs, &config, cli.no_cache, &*handler).await {
            Ok(code) => code,
            Err(error) => {
                tracing::error!(%error, "stylefit failed");
                handler.emit(OutputEvent::RunError { error });
                handler.result(false, None);
                1
            }
        },
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
