//! Query stored JP events by date, time, magnitude and shindo.

use anyhow::{anyhow, Result};

use crate::{
    config::Config,
    db::{ColumnStore, OrderBy, QueryFilter, Warehouse},
    quake::JpQuake,
    timestamp,
};

#[derive(Debug, Default, Clone)]
pub struct QueryArgs {
    pub date: Option<String>,
    pub time: Option<String>,
    pub min_magnitude: Option<f64>,
    pub intensity: Option<String>,
    pub limit: Option<i64>,
    pub count: bool,
    pub column: bool,
}

impl QueryArgs {
    /// Builds the row filter. Dates and times may be given in either
    /// supported form.
    pub fn filter(&self) -> Result<QueryFilter> {
        let date = match &self.date {
            Some(text) => Some(
                timestamp::normalize_date_filter(text).ok_or_else(|| anyhow!("unrecognised date `{text}`"))?,
            ),
            None => None,
        };
        let time = match &self.time {
            Some(text) => Some(
                timestamp::normalize_time_filter(text).ok_or_else(|| anyhow!("unrecognised time `{text}`"))?,
            ),
            None => None,
        };

        Ok(QueryFilter {
            located_only: false,
            min_magnitude: self.min_magnitude,
            date,
            time,
            intensity: self.intensity.clone(),
            limit: self.limit,
        })
    }
}

pub async fn query(config: &Config, args: &QueryArgs) -> Result<String> {
    let filter = args.filter()?;

    if args.count {
        let n = if args.column {
            ColumnStore::new(config.column_url()).count(&filter).await?
        } else {
            Warehouse::new(config.warehouse_url()).count_jp(&filter).await?
        };
        return Ok(n.to_string());
    }

    let rows = if args.column {
        ColumnStore::new(config.column_url())
            .query_all(OrderBy::NewestFirst, &filter)
            .await?
    } else {
        Warehouse::new(config.warehouse_url())
            .query_jp(OrderBy::NewestFirst, &filter)
            .await?
    };

    Ok(rows.iter().map(format_row).collect::<Vec<_>>().join("\n"))
}

fn format_row(q: &JpQuake) -> String {
    let magnitude = q
        .magnitude
        .map_or_else(|| crate::quake::NOT_REPORTED.to_string(), |m| format!("M{m}"));
    let position = match (q.lat, q.lon) {
        (Some(lat), Some(lon)) => format!(" ({lat:.2}, {lon:.2})"),
        _ => String::new(),
    };

    format!(
        "{} {}  {}  {}  shindo {}{}",
        q.date.as_deref().unwrap_or("----------"),
        q.time.as_deref().unwrap_or("--:--:--"),
        q.epicenter.as_deref().unwrap_or("?"),
        magnitude,
        q.intensity.as_str(),
        position
    )
}

// -- Tests -------------------------------------------------------------------
