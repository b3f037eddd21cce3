//! NLU CLI - Command-line interface for NLU model lifecycle automation
//!
//! This CLI provides an `nlu` command that trains, tests and cleans up
//! Amazon Lex and LUIS models from labeled utterance files.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

use commands::{clean, test, train};

/// NLU CLI - Train, test and clean up NLU models
#[derive(Parser, Debug)]
#[command(
    name = "nlu",
    author,
    version,
    about = "Train, test and clean up Amazon Lex and LUIS models",
    long_about = "nlu drives the lifecycle of NLU models on Amazon Lex and LUIS.\nUtterances and entity types are read from JSON files; service settings come from TOML configuration and environment variables."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Shortcut for --log-level debug
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Shortcut for --log-level error
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train and publish a model
    ///
    /// Creates the bot or app when needed, imports the training data, builds
    /// it and publishes the result.
    Train(train::TrainArgs),

    /// Predict utterances against a published model
    ///
    /// Writes the predictions as a JSON array of labeled utterances.
    Test(test::TestArgs),

    /// Delete a model and its published alias
    Clean(clean::CleanArgs),
}

impl Args {
    fn level(&self) -> Level {
        if self.verbose {
            return Level::DEBUG;
        }
        if self.quiet {
            return Level::ERROR;
        }
        match self.log_level.as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so `nlu test` output stays valid JSON.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.level())
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let result = match args.command {
        Command::Train(args) => train::execute(args, cancel).await,
        Command::Test(args) => test::execute(args, cancel).await,
        Command::Clean(args) => clean::execute(args, cancel).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}
