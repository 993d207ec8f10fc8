//! Command-line interface definition for procassist
//!
//! This module defines the CLI structure using clap's derive API,
//! providing the interactive chat and the three direct API forms.

use crate::api::HistoryLimit;
use clap::{Parser, Subcommand};

/// procassist - Doctor procedures assistant
///
/// Chat with the intent-mapping agent, or call the procedures API
/// directly to add records, get quotes and list history.
#[derive(Parser, Debug, Clone)]
#[command(name = "procassist")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the API base URL (without stage)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Override the deployment stage
    #[arg(long)]
    pub stage: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for procassist
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session with the assistant
    Chat,

    /// Add a procedure record for a doctor
    Add {
        /// Doctor's name
        #[arg(short, long)]
        doctor: String,

        /// Procedure code, e.g. TEST001
        #[arg(long)]
        code: String,

        /// Procedure name
        #[arg(short, long)]
        name: String,

        /// Procedure cost; "$" and thousands separators are accepted
        #[arg(long)]
        cost: String,
    },

    /// Get a cost quote for a procedure code
    Quote {
        /// Procedure code to quote
        #[arg(long)]
        code: String,

        /// Restrict the quote to one doctor
        #[arg(short, long)]
        doctor: Option<String>,

        /// Print the raw response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a doctor's procedure history
    History {
        /// Doctor's name
        #[arg(short, long)]
        doctor: String,

        /// Number of records (5, 10 or 20); defaults to history.default_limit
        #[arg(short, long)]
        limit: Option<HistoryLimit>,

        /// Only include procedures on or after this date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        start: Option<String>,

        /// Only include procedures on or before this date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        end: Option<String>,

        /// Print the raw response as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            base_url: None,
            stage: None,
            command: Commands::Chat,
        }
    }
}
