pub mod completions;
pub mod config;
pub mod import;
pub mod inspect;
pub mod preview;
pub mod recent;
pub mod statement;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::normalize::DateOrder;

#[derive(Parser)]
#[command(
    name = "stmt-import",
    version,
    about = "Import bank and card statement CSVs into Books."
)]
pub struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Neither read nor update the recent cards/statements list
    #[arg(long = "no-history", global = true)]
    pub no_history: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a file's columns and the proposed field mapping.
    Inspect {
        /// Statement CSV file
        file: PathBuf,
        /// Override a mapping: field=Header (repeatable, empty header unmaps)
        #[arg(long = "map", value_name = "FIELD=HEADER")]
        map: Vec<String>,
    },
    /// Normalize a statement and show what would be imported.
    Preview {
        #[command(flatten)]
        statement: StatementArgs,
    },
    /// Normalize a statement and send it to the backend.
    Import {
        #[command(flatten)]
        statement: StatementArgs,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
        /// Ask for the API token instead of reading it from settings/env
        #[arg(long = "prompt-token")]
        prompt_token: bool,
    },
    /// List recently used cards and imported statements.
    Recent {
        /// Forget everything in the recent list
        #[arg(long)]
        clear: bool,
    },
    /// Show or change settings.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Args, Debug)]
pub struct StatementArgs {
    /// Statement CSV file
    pub file: PathBuf,
    /// Card id the statement belongs to (default: most recently used card)
    #[arg(long)]
    pub card: Option<String>,
    /// Statement period start: YYYY-MM-DD
    #[arg(long = "from", value_name = "DATE")]
    pub period_start: Option<NaiveDate>,
    /// Statement period end: YYYY-MM-DD
    #[arg(long = "to", value_name = "DATE")]
    pub period_end: Option<NaiveDate>,
    /// Override a mapping: field=Header (repeatable, empty header unmaps)
    #[arg(long = "map", value_name = "FIELD=HEADER")]
    pub map: Vec<String>,
    /// How to read NN/NN/YYYY dates (default from settings)
    #[arg(long = "date-order", value_enum)]
    pub date_order: Option<DateOrder>,
    /// Review each field's column before previewing
    #[arg(long, short = 'i')]
    pub interactive: bool,
    /// Transactions to list in the preview table
    #[arg(long, default_value = "20")]
    pub rows: usize,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print current settings.
    Show,
    /// Set a value, e.g. `config set api_base_url https://books.example.com`.
    Set {
        key: String,
        value: String,
    },
}
