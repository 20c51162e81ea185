#![forbid(unsafe_code)]

mod cmd;
mod output;

use agency_core::config::load_user_config;
use clap::{CommandFactory, Parser, Subcommand};
use cmd::CodedError;
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "ag",
    author,
    version,
    about = "ag: priority scoring and cascading hierarchy selection",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output (shorthand for `--format json`).
    #[arg(long, global = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Scoring",
        about = "Score one urgency/importance pair",
        long_about = "Score an urgency/importance pair into a 1-6 priority bucket with its label and badge classes. Unknown or missing values count as medium unless --strict is given.",
        after_help = "EXAMPLES:\n    # Score a pair\n    ag score --urgency critical --importance medium\n\n    # Reject unknown values\n    ag score --urgency soon --strict\n\n    # Emit machine-readable output\n    ag score -u high -i high --json"
    )]
    Score(cmd::score::ScoreArgs),

    #[command(
        next_help_heading = "Scoring",
        about = "Print the full priority matrix",
        long_about = "Print every urgency/importance combination with its score and label.",
        after_help = "EXAMPLES:\n    # Show the matrix\n    ag matrix\n\n    # Emit machine-readable output\n    ag matrix --json"
    )]
    Matrix,

    #[command(
        next_help_heading = "Scoring",
        about = "Rank records by recomputed priority",
        long_about = "Rank requirements, sets, pitches and phases from a JSON dataset by their recomputed score. Stored priorities are only reported, never trusted.",
        after_help = "EXAMPLES:\n    # Rank everything in a dataset\n    ag rank --input data.json\n\n    # Requirements whose stored priority is stale\n    ag rank --input data.json --kind requirements --drift-only\n\n    # Read the dataset from stdin\n    cat data.json | ag rank --input - --json"
    )]
    Rank(cmd::rank::RankArgs),

    #[command(
        next_help_heading = "Hierarchy",
        about = "Resolve a cascading form selection",
        long_about = "Open a form over a JSON dataset with optional default ids, back-fill missing ancestors, clear selections that fall outside their candidates, and print the candidates per tier.",
        after_help = "EXAMPLES:\n    # Open a requirement form with a default pitch\n    ag resolve --input data.json --form requirement --pitch login\n\n    # Switch client after opening\n    ag resolve --input data.json --form requirement --project portal --change client=acme\n\n    # Fail when a supplied id is not valid\n    ag resolve --input data.json --form set --client acme --project portal --strict"
    )]
    Resolve(cmd::resolve::ResolveArgs),

    #[command(
        next_help_heading = "Configuration",
        about = "Inspect configuration",
        long_about = "Show the effective project and user configuration.",
        after_help = "EXAMPLES:\n    # Show resolved config\n    ag config show\n\n    # Show raw project config\n    ag config show --project"
    )]
    Config(cmd::config::ConfigArgs),

    #[command(
        next_help_heading = "Configuration",
        about = "Generate shell completions",
        long_about = "Generate shell completion scripts for ag.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    ag completions bash > ~/.local/share/bash-completion/completions/ag"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("AGENCY_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "agency=debug,ag=debug,info"
        } else {
            "agency=info,ag=info,warn"
        })
    });

    let format = env::var("AGENCY_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn cli_error(err: &anyhow::Error) -> CliError {
    match err.downcast_ref::<CodedError>() {
        Some(coded) => CliError::from_code(coded.code, coded.message.clone()),
        None => CliError::new(format!("{err:#}")),
    }
}

fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<()> {
    let project_root = env::current_dir()?;

    match &cli.command {
        Commands::Score(args) => cmd::score::run_score(args, output),
        Commands::Matrix => cmd::score::run_matrix(output),
        Commands::Rank(args) => cmd::rank::run_rank(args, output, &project_root),
        Commands::Resolve(args) => cmd::resolve::run_resolve(args, output, &project_root),
        Commands::Config(args) => cmd::config::run_config(args, &project_root, output),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let user_output = match load_user_config() {
        Ok(user) => user.output,
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "ignoring unreadable user config");
            None
        }
    };
    let output = resolve_output_mode(cli.format, cli.json, user_output.as_deref());

    match run(&cli, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = %format!("{err:#}"), "command failed");
            if let Err(render_err) = render_error(output, &cli_error(&err)) {
                eprintln!("error: {err:#} ({render_err})");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agency_core::error::ErrorCode;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn json_flag_after_subcommand() {
        let cli = Cli::parse_from(["ag", "matrix", "--json"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Matrix));
    }

    #[test]
    fn format_flag_parses_value_enum() {
        let cli = Cli::parse_from(["ag", "--format", "text", "matrix"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
    }

    #[test]
    fn coded_errors_keep_their_code() {
        let err = anyhow::Error::from(CodedError::new(ErrorCode::EntityNotFound, "gone"));
        let rendered = cli_error(&err);
        assert_eq!(rendered.error_code.as_deref(), Some("E2001"));
        assert_eq!(rendered.message, "gone");
    }

    #[test]
    fn plain_errors_have_no_code() {
        let err = anyhow::anyhow!("boom").context("while ranking");
        let rendered = cli_error(&err);
        assert!(rendered.error_code.is_none());
        assert_eq!(rendered.message, "while ranking: boom");
    }
}
