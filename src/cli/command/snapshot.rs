//! Save the weekly global feed to a date-stamped parquet file.

use anyhow::{Context, Result};

use crate::{
    cli::create_spinner,
    config::Config,
    download::build_client,
    feed,
    parquet,
    quake::global::DASHBOARD_CUTOFF,
};

use super::make_parquet_file_name;

pub async fn snapshot(config: &Config) -> Result<String> {
    let client = build_client(config.http_timeout())?;
    let parquet_file_name = make_parquet_file_name("global")?;

    let bar = create_spinner("Downloading global feed...".to_string());
    let quakes = feed::fetch_global(&client, &config.global_feed_url, DASHBOARD_CUTOFF, &bar)
        .await
        .context("global feed download failed")?;
    bar.finish_with_message(format!("{} events downloaded", quakes.len()));

    parquet::save_global(&quakes, &parquet_file_name)?;

    Ok(parquet_file_name.to_string_lossy().to_string())
}
