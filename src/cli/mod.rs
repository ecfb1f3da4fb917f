use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod formatters;

#[derive(Parser)]
#[command(name = "fatura")]
#[command(
    version,
    about = "Credit-card statement reader with declared-total reconciliation"
)]
#[command(
    long_about = "Reads Itaú-style credit-card statements (PDF or text dumps), extracts one ledger line per charge, attributes each to its card and holder, and checks the result against the total the statement declares."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Engine configuration file (TOML). Defaults to <config dir>/fatura/config.toml
    #[arg(long = "config", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract transactions from one or more statements
    Process {
        /// Statement files (.pdf or .txt)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Also write every extracted transaction to this CSV file
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,
    },

    /// Check each statement's extracted sum against its declared total
    Validate {
        /// Statement files (.pdf or .txt)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show the page texts exactly as the engine sees them
    Inspect {
        /// Statement file (.pdf or .txt)
        file: PathBuf,
    },
}
