mod cli;
mod error;
mod fmt;
mod mapping;
mod models;
mod normalize;
mod recent;
mod settings;
mod submit;
mod table;
mod wizard;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigCommands};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,stmt_import={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Inspect { file, map } => cli::inspect::run(&file, &map),
        Commands::Preview { statement } => cli::preview::run(&statement, cli.no_history),
        Commands::Import {
            statement,
            yes,
            prompt_token,
        } => cli::import::run(&statement, yes, prompt_token, cli.no_history),
        Commands::Recent { clear } => cli::recent::run(clear),
        Commands::Config { command } => match command {
            ConfigCommands::Show => cli::config::show(),
            ConfigCommands::Set { key, value } => cli::config::set(&key, &value),
        },
        Commands::Completions { shell } => cli::completions::run(shell),
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
