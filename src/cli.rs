//! Command-line argument parsing for the SPBI dashboard.

use clap::{Parser, Subcommand};
use spbi_dashboard::config::ConnectionDescriptor;
use spbi_dashboard::dashboard::{Action, DEFAULT_TRANSACTION_ROWS};
use spbi_dashboard::error::Result;
use spbi_dashboard::output::OutputFormat;
use std::path::PathBuf;

/// View and release rows in the SPBI fuel-dispensing database.
#[derive(Parser, Debug)]
#[command(name = "spbi-dashboard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path (JSON with JDBC_DRIVER, JDBC_URL, USERNAME, PASSWORD, JAR_FILE)
    #[arg(long, global = true, value_name = "PATH", env = "SPBI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(long, global = true, value_name = "FORMAT", default_value = "text")]
    pub output: String,

    /// Append logs to a file instead of stderr (default location if PATH is omitted)
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<Option<PathBuf>>,

    #[command(subcommand)]
    pub command: Command,
}

/// Dashboard commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show RFID-to-plate mappings
    RfidMap {
        /// Only show this card number
        #[arg(long, value_name = "CARDNO")]
        cardno: Option<String>,
    },

    /// Show unprinted fuel transactions
    Transactions {
        /// Number of rows to show (1-1000)
        #[arg(short = 'n', long, value_name = "ROWS", default_value_t = DEFAULT_TRANSACTION_ROWS)]
        limit: u32,

        /// Only show this card number
        #[arg(long, value_name = "CARDNO")]
        cardno: Option<String>,
    },

    /// Show the site location
    Location,

    /// List plates allowed to refuel
    Plates,

    /// Find plates that cannot refuel (processed = 1)
    Stuck,

    /// Release a stuck plate by quota row ID
    Release {
        /// Quota row ID (numeric)
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Validate the config file and print the connection it describes
    CheckConfig,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses --config (or SPBI_CONFIG) if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(ConnectionDescriptor::default_path)
    }

    /// Parses the output format from the --output argument.
    pub fn parse_output_format(&self) -> std::result::Result<OutputFormat, String> {
        self.output.parse()
    }

    /// Returns true if logs should go to a file.
    pub fn logs_to_file(&self) -> bool {
        self.log_file.is_some()
    }

    /// Converts the command into a dashboard action.
    ///
    /// Returns `None` for commands that do not touch the database.
    pub fn to_action(&self) -> Result<Option<Action>> {
        let action = match &self.command {
            Command::RfidMap { cardno } => Action::rfid_map(cardno.as_deref()),
            Command::Transactions { limit, cardno } => {
                Action::transactions(*limit, cardno.as_deref())?
            }
            Command::Location => Action::Location,
            Command::Plates => Action::Plates,
            Command::Stuck => Action::StuckPlates,
            Command::Release { id } => Action::release(id)?,
            Command::CheckConfig => return Ok(None),
        };
        Ok(Some(action))
    }
}
