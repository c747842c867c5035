//! Fetch a source and reload its table.

use anyhow::{Context, Result};

use crate::{
    cli::{create_progress_bar, create_spinner, Source},
    config::Config,
    db::{ColumnStore, Warehouse},
    download::build_client,
    refresh,
};

pub async fn refresh(config: &Config, source: Source) -> Result<String> {
    let client = build_client(config.http_timeout())?;
    let warehouse = Warehouse::new(config.warehouse_url());
    let mut report = Vec::new();

    if matches!(source, Source::Global | Source::All) {
        let bar = create_spinner("Refreshing global table...".to_string());
        let rows = refresh::global(&client, config, &warehouse, &bar)
            .await
            .context("global refresh failed")?;
        bar.finish_with_message(format!("{rows} global rows loaded"));
        report.push(format!("{rows} global"));
    }

    if matches!(source, Source::Jp | Source::All) {
        let bar = create_progress_bar(0, "Fetching JP detail pages".to_string());
        let rows = refresh::jp(&client, config, &warehouse, &bar)
            .await
            .context("JP refresh failed")?;
        bar.finish_with_message(format!("{rows} JP rows loaded"));
        report.push(format!("{rows} JP"));
    }

    if matches!(source, Source::JpColumn | Source::All) {
        let store = ColumnStore::new(config.column_url());
        let bar = create_spinner("Refreshing column store...".to_string());
        let rows = refresh::column(&client, config, &store)
            .await
            .context("column store refresh failed")?;
        bar.finish_with_message(format!("{rows} column store rows written"));
        report.push(format!("{rows} column store"));
    }

    Ok(report.join(", "))
}
