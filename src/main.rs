mod agent;
mod cli;
mod config;
mod csv_export;
mod db;
mod download;
mod error;
mod feed;
mod http;
mod parquet;
mod quake;
mod refresh;
mod timestamp;
mod upload;

use std::process::ExitCode;

use clap::Parser;
use cli::{command, Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    match cli.command {
        Commands::Serve { bind } => match command::serve(config, &bind).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => failure(&e, 1),
        },
        Commands::Export {
            output,
            upload_stage,
            gzip,
        } => match command::export(&config, &output, upload_stage, gzip).await {
            Ok(location) => {
                println!("File saved to `{}`", location);
                ExitCode::SUCCESS
            }
            Err(e) => failure(&e, command::export::exit_code(&e)),
        },
        Commands::Refresh { source } => match command::refresh(&config, source).await {
            Ok(report) => {
                println!("Loaded {}", report);
                ExitCode::SUCCESS
            }
            Err(e) => failure(&e, 1),
        },
        Commands::Snapshot {} => match command::snapshot(&config).await {
            Ok(filename) => {
                println!("File saved to `{}`", filename);
                ExitCode::SUCCESS
            }
            Err(e) => failure(&e, 1),
        },
        Commands::Query {
            date,
            time,
            min_magnitude,
            intensity,
            limit,
            count,
            column,
        } => {
            let args = command::query::QueryArgs {
                date,
                time,
                min_magnitude,
                intensity,
                limit,
                count,
                column,
            };
            match command::query(&config, &args).await {
                Ok(rows) => {
                    println!("{}", rows);
                    ExitCode::SUCCESS
                }
                Err(e) => failure(&e, 1),
            }
        }
        Commands::Chat { trace } => match command::chat(&config, trace).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => failure(&e, 1),
        },
    }
}

fn failure(error: &anyhow::Error, code: u8) -> ExitCode {
    eprintln!("Error: {:#}", error);
    ExitCode::from(code)
}
