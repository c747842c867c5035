//! Fetch-then-load pipelines shared by the dashboard and the CLI.

use indicatif::ProgressBar;
use reqwest::Client;

use crate::{
    config::Config,
    db::{ColumnStore, Warehouse},
    error::RefreshError,
    feed,
    quake::{global::DASHBOARD_CUTOFF, DetailOutcome, JpQuake},
};

/// Reloads the global table from the weekly feed.
pub async fn global(
    client: &Client,
    config: &Config,
    warehouse: &Warehouse,
    progress_bar: &ProgressBar,
) -> Result<u64, RefreshError> {
    let quakes = feed::fetch_global(client, &config.global_feed_url, DASHBOARD_CUTOFF, progress_bar).await?;
    Ok(warehouse.replace_global(&quakes).await?)
}

/// Reloads the JP table from the detail pages. Unavailable events are stored
/// as placeholder rows.
pub async fn jp(
    client: &Client,
    config: &Config,
    warehouse: &Warehouse,
    progress_bar: &ProgressBar,
) -> Result<u64, RefreshError> {
    let outcomes = feed::fetch_jp(client, &config.jp_list_url, &config.jp_base_url, progress_bar).await?;
    let records: Vec<JpQuake> = outcomes.into_iter().map(DetailOutcome::into_record).collect();
    let located = records.iter().filter(|r| r.is_located()).count();
    tracing::debug!(rows = records.len(), located, "JP records ready");

    Ok(warehouse.replace_jp(&records).await?)
}

/// Upserts the listing rows into the column store.
pub async fn column(client: &Client, config: &Config, store: &ColumnStore) -> Result<usize, RefreshError> {
    let rows = feed::fetch_jp_listing(client, &config.jp_list_url).await?;
    let records: Vec<JpQuake> = rows.iter().map(|r| r.to_quake()).collect();

    Ok(store.insert_all(&records).await?)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        config::test::config_for,
        db::{test::temp_url, OrderBy, QueryFilter},
        download::build_client,
        quake::{global::test::feed_fixture, jp::test::listing_fixture},
    };
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn should_reload_global_idempotently() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed/all_week.geojson"))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed_fixture()))
            .mount(&server)
            .await;

        let (_w, warehouse_url) = temp_url("warehouse");
        let (_c, column_url) = temp_url("column");
        let config = config_for(&server.uri(), warehouse_url.clone(), column_url);
        let warehouse = Warehouse::new(warehouse_url);
        let client = build_client(Duration::from_secs(5)).unwrap();

        let first = global(&client, &config, &warehouse, &ProgressBar::hidden()).await.unwrap();
        let rows_first = warehouse.query_global(OrderBy::NewestFirst, &QueryFilter::default()).await.unwrap();
        let second = global(&client, &config, &warehouse, &ProgressBar::hidden()).await.unwrap();
        let rows_second = warehouse.query_global(OrderBy::NewestFirst, &QueryFilter::default()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(rows_first, rows_second);
    }

    #[tokio::test]
    async fn should_surface_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (_w, warehouse_url) = temp_url("warehouse");
        let (_c, column_url) = temp_url("column");
        let config = config_for(&server.uri(), warehouse_url.clone(), column_url);
        let warehouse = Warehouse::new(warehouse_url);
        let client = build_client(Duration::from_secs(5)).unwrap();

        let result = global(&client, &config, &warehouse, &ProgressBar::hidden()).await;

        assert!(matches!(result, Err(RefreshError::Fetch(_))));
        assert_eq!(warehouse.count_global(&QueryFilter::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn should_load_listing_into_column_store() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather/jp/earthquake/list/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_fixture()))
            .mount(&server)
            .await;

        let (_w, warehouse_url) = temp_url("warehouse");
        let (_c, column_url) = temp_url("column");
        let config = config_for(&server.uri(), warehouse_url, column_url.clone());
        let store = ColumnStore::new(column_url);
        let client = build_client(Duration::from_secs(5)).unwrap();

        assert_eq!(column(&client, &config, &store).await.unwrap(), 2);
        assert_eq!(column(&client, &config, &store).await.unwrap(), 2);
        assert_eq!(store.count(&QueryFilter::default()).await.unwrap(), 2);
    }
}
