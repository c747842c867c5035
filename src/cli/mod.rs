//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use clap::{command, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Config;

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the dashboard and JSON endpoints
    Serve {
        #[arg(long, env = "QUAKEWATCH_BIND", default_value = "127.0.0.1:8080")]
        bind: String,
    },
    /// Export the monthly global feed to CSV
    Export {
        #[arg(short, long, default_value = "all_month.csv")]
        output: PathBuf,
        /// Upload the file to the configured stage
        #[arg(long)]
        upload_stage: bool,
        /// Gzip the file before uploading
        #[arg(long)]
        gzip: bool,
    },
    /// Fetch a source and reload its table
    Refresh {
        #[arg(value_enum, default_value_t = Source::All)]
        source: Source,
    },
    /// Save the weekly global feed to parquet
    Snapshot {},
    /// Query stored JP events
    Query {
        /// `YYYY-MM-DD` or `YYYY年M月D日`
        #[arg(long)]
        date: Option<String>,
        /// `HH:MM[:SS]` or `H時M分ごろ`
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        min_magnitude: Option<f64>,
        /// Shindo, e.g. `4` or `5弱`
        #[arg(long)]
        intensity: Option<String>,
        #[arg(long)]
        limit: Option<i64>,
        /// Print only the number of matches
        #[arg(long)]
        count: bool,
        /// Read the column store instead of the warehouse
        #[arg(long)]
        column: bool,
    },
    /// Chat with the hosted data agent
    Chat {
        /// Print an event summary after each answer
        #[arg(long)]
        trace: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Source {
    Global,
    Jp,
    JpColumn,
    All,
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    let bar = ProgressBar::new(size).with_message(message);
    if let Ok(style) = ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}") {
        bar.set_style(style.progress_chars("##-"));
    }

    bar
}

// -- Tests -------------------------------------------------------------------
