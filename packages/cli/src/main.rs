mod commands;
mod config;
mod logging;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{apply, check, history, inspect, ApplyArgs, CheckArgs, HistoryArgs, InspectArgs};
use config::Config;
use std::path::PathBuf;

/// tei-annotate - Annotate TEI documents with speakers, names and relationships
#[derive(Parser, Debug)]
#[command(name = "tei-annotate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to tei.config.json in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level, ignoring RUST_LOG and the config
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize a document's metadata, passages and cast
    Inspect(InspectArgs),

    /// Apply a JSON mutation script and write the result
    Apply(ApplyArgs),

    /// Print the event log produced by a mutation script as JSON lines
    History(HistoryArgs),

    /// Verify that documents survive a write/read round trip
    Check(CheckArgs),
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()
        .context("Cannot get current directory")?
        .display()
        .to_string();

    let config = match &cli.config {
        Some(path) => Config::load_from(path).with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load(&cwd)?,
    };

    logging::init(&config.log_level, cli.verbose);
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Command::Inspect(args) => inspect(args),
        Command::Apply(args) => apply(args, &config, &cwd),
        Command::History(args) => history(args),
        Command::Check(args) => check(args, &config),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply_arguments() {
        let cli = Cli::parse_from([
            "tei-annotate",
            "apply",
            "novel.xml",
            "--mutations",
            "edits.json",
            "--undo-to",
            "2",
            "--verbose",
        ]);

        assert!(cli.verbose);
        match cli.command {
            Command::Apply(args) => {
                assert_eq!(args.file, PathBuf::from("novel.xml"));
                assert_eq!(args.mutations, PathBuf::from("edits.json"));
                assert_eq!(args.undo_to, Some(2));
                assert_eq!(args.out, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
