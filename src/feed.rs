//! Fetches both sources and turns them into records.
//!
//! Whole-feed failures are returned to the caller. Failures on a single JP
//! detail page become [`DetailOutcome::Unavailable`] and the batch carries on.

use std::collections::HashSet;

use futures::{stream, StreamExt};
use indicatif::ProgressBar;
use reqwest::{Client, Url};

use crate::{
    download::{fetch_text, fetch_text_with_progress},
    error::FetchError,
    quake::{
        global::{self, Feature, GlobalQuake},
        jp::{self, DetailOutcome, ListingRow},
    },
};

/// Maximum number of detail pages in flight.
pub const DETAIL_POOL_WIDTH: usize = 8;

/// Downloads the GeoJSON feed and returns features with `mag >= cutoff`.
pub async fn fetch_global_features(
    client: &Client,
    url: &str,
    cutoff: f64,
    progress_bar: &ProgressBar,
) -> Result<Vec<Feature>, FetchError> {
    let body = fetch_text_with_progress(client, url, progress_bar).await?;
    let features = global::parse_features(&body)?;
    let total = features.len();

    let kept = global::filter_by_magnitude(features, cutoff);
    tracing::info!(total, kept = kept.len(), cutoff, "global feed parsed");

    Ok(kept)
}

/// Downloads the GeoJSON feed and maps it to warehouse rows.
pub async fn fetch_global(
    client: &Client,
    url: &str,
    cutoff: f64,
    progress_bar: &ProgressBar,
) -> Result<Vec<GlobalQuake>, FetchError> {
    let body = fetch_text_with_progress(client, url, progress_bar).await?;
    let quakes = global::parse_quakes(&body, cutoff)?;
    tracing::info!(rows = quakes.len(), cutoff, "global feed parsed");

    Ok(quakes)
}

/// Downloads and parses the JP listing table.
pub async fn fetch_jp_listing(client: &Client, list_url: &str) -> Result<Vec<ListingRow>, FetchError> {
    let html = fetch_text(client, list_url).await?;
    let rows = jp::parse_listing(&html)?;
    tracing::info!(rows = rows.len(), "JP listing parsed");

    Ok(rows)
}

/// Fetches the JP source.
///
/// When the listing links to detail pages, each unique page is fetched with at
/// most [`DETAIL_POOL_WIDTH`] requests in flight and results are returned in
/// listing order. Otherwise the four listing columns are used as they are.
pub async fn fetch_jp(
    client: &Client,
    list_url: &str,
    base_url: &str,
    progress_bar: &ProgressBar,
) -> Result<Vec<DetailOutcome>, FetchError> {
    let rows = fetch_jp_listing(client, list_url).await?;

    if rows.iter().all(|r| r.detail_href.is_none()) {
        return Ok(rows
            .iter()
            .map(|r| DetailOutcome::Parsed(r.to_quake()))
            .collect());
    }

    let targets = detail_targets(&rows, base_url);
    Ok(fetch_details(client, targets, progress_bar).await)
}

/// Resolves detail links against `base_url`, dropping repeated URLs. Rows
/// without a usable link keep their slot as `None`.
pub fn detail_targets(rows: &[ListingRow], base_url: &str) -> Vec<Option<String>> {
    let base = Url::parse(base_url).ok();
    let mut seen = HashSet::new();
    let mut targets = Vec::with_capacity(rows.len());

    for row in rows {
        let url = row
            .detail_href
            .as_deref()
            .and_then(|href| match &base {
                Some(base) => base.join(href).ok(),
                None => Url::parse(href).ok(),
            })
            .map(String::from);

        match url {
            Some(url) if !seen.insert(url.clone()) => continue,
            other => targets.push(other),
        }
    }

    targets
}

/// Fetches detail pages through the bounded pool, preserving submission order.
pub async fn fetch_details(
    client: &Client,
    targets: Vec<Option<String>>,
    progress_bar: &ProgressBar,
) -> Vec<DetailOutcome> {
    progress_bar.set_length(targets.len() as u64);

    let outcomes: Vec<DetailOutcome> = stream::iter(targets)
        .map(|target| async move {
            let outcome = match target {
                Some(url) => fetch_detail(client, &url).await,
                None => DetailOutcome::unavailable(None, "listing row has no detail link"),
            };
            progress_bar.inc(1);
            outcome
        })
        .buffered(DETAIL_POOL_WIDTH)
        .collect()
        .await;

    let parsed = outcomes.iter().filter(|o| o.is_parsed()).count();
    tracing::info!(parsed, unavailable = outcomes.len() - parsed, "JP detail pages fetched");

    outcomes
}

/// Fetches and parses one detail page. Never fails; problems are tagged.
pub async fn fetch_detail(client: &Client, url: &str) -> DetailOutcome {
    let parsed = match fetch_text(client, url).await {
        Ok(html) => jp::parse_detail(&html).map_err(FetchError::from),
        Err(e) => Err(e),
    };

    match parsed {
        Ok(quake) => DetailOutcome::Parsed(quake),
        Err(e) => {
            tracing::warn!(url, error = %e, "detail page unavailable");
            DetailOutcome::unavailable(Some(url.to_string()), e)
        }
    }
}

// -- Tests -------------------------------------------------------------------
