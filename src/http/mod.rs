//! Dashboard service.

mod dashboard;
mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use reqwest::Client;

use crate::{
    config::Config,
    db::{ColumnStore, Warehouse},
};

/// Everything a handler needs, built once at startup.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Config,
    pub client: Client,
    pub warehouse: Warehouse,
    pub column_store: ColumnStore,
}

impl AppState {
    pub fn new(config: Config, client: Client) -> Self {
        let warehouse = Warehouse::new(config.warehouse_url());
        let column_store = ColumnStore::new(config.column_url());

        AppState {
            config,
            client,
            warehouse,
            column_store,
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/refresh", get(handlers::refresh_column))
        .route("/refresh_global", get(handlers::refresh_global))
        .route("/refresh_jp", get(handlers::refresh_jp))
        .route("/jp_coordinates", get(handlers::jp_coordinates))
        .route("/global_coordinates", get(handlers::global_coordinates))
        .route("/count_global_earthquakes", get(handlers::count_global))
        .route("/count_jp_earthquakes", get(handlers::count_jp))
        .route(
            "/count_significant_global_earthquakes",
            get(handlers::count_significant_global),
        )
        .route("/count_significant_jp_earthquakes", get(handlers::count_significant_jp))
        .with_state(state)
}

// -- Tests -------------------------------------------------------------------
