//! Hayroll CLI - command-line driver for the preprocessor-aware
//! transpilation pipeline.
//!
//! # Usage
//!
//! ```bash
//! # Primary form
//! hayroll compile_commands.json output/
//!
//! # Compatibility alias
//! hayroll transpile compile_commands.json -o output/
//! ```

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use hayroll_core::config::Config;
use hayroll_core::driver::{self, ExternalTools};
use hayroll_core::CompileCommand;

#[derive(Parser)]
#[command(name = "hayroll")]
#[command(about = "Preprocessor-aware C-to-Rust transpilation pipeline", long_about = None)]
#[command(version)]
struct Cli {
    /// `compile_commands.json` path (omitted when using the `transpile` subcommand)
    compile_commands: Option<PathBuf>,

    /// Output directory (omitted when using the `transpile` subcommand)
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,

    /// Project root; defaults to the parent of the compile-commands file
    #[arg(short = 'p', long = "project-dir", global = true)]
    project_dir: Option<PathBuf>,

    /// JSON array of macro names eligible for symbolic execution
    #[arg(short = 'w', long = "whitelist", global = true)]
    whitelist: Option<PathBuf>,

    /// Worker count; 0 means auto-detect
    #[arg(short = 'j', long = "jobs", default_value_t = 0, global = true)]
    jobs: usize,

    /// Enable inline macro expansion in the final target text
    #[arg(short = 'i', long = "inline", global = true)]
    inline: bool,

    /// Raise log verbosity; repeatable up to twice (debug, then trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit a binary target entry keyed by a translation-unit basename
    #[arg(short = 'b', long = "binary", global = true)]
    binary: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compatibility alias for the primary invocation form
    Transpile {
        compile_commands: PathBuf,

        #[arg(short = 'o', long = "output-dir")]
        output_dir: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(exit_code) => process::exit(exit_code),
        Err(err) => {
            tracing::error!("{err:#}");
            process::exit(2);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let (compile_commands_path, output_dir) = match cli.command {
        Some(Commands::Transpile { compile_commands, output_dir }) => (compile_commands, output_dir),
        None => {
            let compile_commands = cli
                .compile_commands
                .context("missing required argument: compile_commands.json")?;
            let output_dir = cli
                .output_dir
                .context("missing required argument: output_dir")?;
            (compile_commands, output_dir)
        }
    };

    let whitelist = cli
        .whitelist
        .map(|path| -> Result<Vec<String>> {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading whitelist file {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing whitelist file {}", path.display()))
        })
        .transpose()?;

    let project_dir = cli.project_dir.unwrap_or_else(|| {
        compile_commands_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    });

    let config = Config {
        project_dir,
        jobs: cli.jobs,
        whitelist,
        inline: cli.inline,
        binary: cli.binary,
        verbosity: cli.verbose,
    };

    let raw = std::fs::read_to_string(&compile_commands_path)
        .with_context(|| format!("reading {}", compile_commands_path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {} as JSON", compile_commands_path.display()))?;
    let commands: Vec<CompileCommand> =
        CompileCommand::from_compile_commands_json(&json).context("loading compile commands")?;

    let tools = ExternalTools::default();
    let outcomes = driver::run(&commands, &config, &tools, &output_dir)?;

    let failed: Vec<&driver::UnitOutcome> = outcomes.iter().filter(|o| o.result.is_err()).collect();
    for outcome in &failed {
        if let Err(err) = &outcome.result {
            tracing::error!(file = %outcome.file.display(), "{err:#}");
        }
    }

    Ok(if failed.is_empty() { 0 } else { 1 })
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("hayroll=info,hayroll_core=info,hayroll_cli=info,warn")),
        1 => EnvFilter::new("hayroll=debug,hayroll_core=debug,hayroll_cli=debug,info"),
        _ => EnvFilter::new("hayroll=trace,hayroll_core=trace,hayroll_cli=trace,debug"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
