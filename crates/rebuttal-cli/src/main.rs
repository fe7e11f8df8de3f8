//! Argue the opposing side of a student's debate argument.
//!
//! # Usage
//!
//! ```bash
//! rebuttal --motion "This house would ban homework" --side pro \
//!     --format points --argument "Homework causes stress."
//!
//! # Argument from a file, JSON output, info logs on stderr
//! rebuttal --motion "..." --side con --format referenced_paragraphs \
//!     --argument-file speech.txt --emit json -v
//! ```
//!
//! Configuration is read from the environment (and a `.env` file if present):
//! `LLM_API_KEY` is required; see `rebuttal_runtime::config` for the rest.

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use rebuttal_core::{render_text, CounterArgument, OutputFormat, Side, StudentSubmission};
use rebuttal_runtime::{DebateOrchestrator, Settings};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["argument", "argument_file"]),
))]
struct Cli {
    /// The debate motion, phrased as a statement
    #[arg(long)]
    motion: String,

    /// The side the student argues: pro or con
    #[arg(long)]
    side: Side,

    /// Counter-argument format: points, rebuttal_paragraphs or referenced_paragraphs
    #[arg(long)]
    format: OutputFormat,

    /// The student's argument text
    #[arg(long)]
    argument: Option<String>,

    /// Read the student's argument from a file
    #[arg(long)]
    argument_file: Option<PathBuf>,

    /// How to print the result
    #[arg(long, value_enum, default_value_t = Emit::Text)]
    emit: Emit,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    Text,
    Json,
    Yaml,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load .env file if present (ignore if missing)
    dotenvy::dotenv().ok();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<String> {
    let argument = read_argument(cli.argument, cli.argument_file.as_deref())?;
    let submission =
        StudentSubmission::new(cli.motion, cli.side, argument).context("Invalid submission")?;

    let settings = Settings::from_env().context("Invalid configuration")?;
    let orchestrator = DebateOrchestrator::from_settings(&settings)?;
    tracing::info!(
        model = %settings.model,
        side = %submission.side(),
        format = %cli.format,
        "Running debate pipeline"
    );

    let result = orchestrator.run(&submission, cli.format).await;
    orchestrator.tracer().flush().await;

    render(&result?, cli.emit)
}

fn read_argument(inline: Option<String>, file: Option<&std::path::Path>) -> Result<String> {
    match (inline, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => {
            tracing::info!(path = %path.display(), "Reading argument file");
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read argument file {}", path.display()))
        }
        (None, None) => anyhow::bail!("one of --argument or --argument-file is required"),
    }
}

fn render(counter: &CounterArgument, emit: Emit) -> Result<String> {
    match emit {
        Emit::Text => Ok(render_text(counter)),
        Emit::Json => {
            let json = serde_json::to_string_pretty(counter).context("Failed to serialize JSON")?;
            Ok(json + "\n")
        }
        Emit::Yaml => serde_yaml::to_string(counter).context("Failed to serialize YAML"),
    }
}
