//! Route handlers. Failures are logged and answered with an empty payload.

use std::{fmt::Display, sync::Arc};

use axum::{
    extract::State,
    response::{Html, IntoResponse},
    Json,
};
use indicatif::ProgressBar;
use serde_json::{json, Value};

use crate::{
    db::{OrderBy, QueryFilter},
    quake::{GlobalQuake, JpQuake},
    refresh,
};

use super::{dashboard, AppState};

type AppStateRef = State<Arc<AppState>>;

fn or_empty<T: Default, E: Display>(result: Result<T, E>, what: &str) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "{what} failed");
        T::default()
    })
}

/// Returns false when the feed could not be reloaded; the table then still
/// holds the previous load.
async fn refresh_global_table(state: &AppState) -> bool {
    match refresh::global(&state.client, &state.config, &state.warehouse, &ProgressBar::hidden()).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "global refresh failed");
            false
        }
    }
}

async fn refresh_jp_table(state: &AppState) -> bool {
    match refresh::jp(&state.client, &state.config, &state.warehouse, &ProgressBar::hidden()).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "JP refresh failed");
            false
        }
    }
}

async fn fresh_global(state: &AppState, refreshed: bool) -> (Vec<GlobalQuake>, Vec<GlobalQuake>) {
    if !refreshed {
        return Default::default();
    }
    let quakes = or_empty(
        state.warehouse.query_global(OrderBy::NewestFirst, &QueryFilter::default()).await,
        "global query",
    );
    (quakes, recent_global(state).await)
}

async fn fresh_jp(state: &AppState, refreshed: bool) -> (Vec<JpQuake>, Vec<JpQuake>) {
    if !refreshed {
        return Default::default();
    }
    let quakes = or_empty(
        state.warehouse.query_jp(OrderBy::NewestFirst, &QueryFilter::located()).await,
        "JP query",
    );
    (quakes, recent_jp(state).await)
}

async fn recent_global(state: &AppState) -> Vec<GlobalQuake> {
    or_empty(state.warehouse.most_recent_global().await, "most recent global query")
        .into_iter()
        .collect()
}

async fn recent_jp(state: &AppState) -> Vec<JpQuake> {
    or_empty(state.warehouse.most_recent_jp().await, "most recent JP query")
        .into_iter()
        .collect()
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn index(State(state): AppStateRef) -> Html<String> {
    let (global_ok, jp_ok) = tokio::join!(refresh_global_table(&state), refresh_jp_table(&state));

    let (global, latest_global) = fresh_global(&state, global_ok).await;
    let (jp, latest_jp) = fresh_jp(&state, jp_ok).await;

    Html(dashboard::render(&jp, &global, latest_jp.first(), latest_global.first()))
}

/// Column-store refresh; rows as `[date, time, epicenter, magnitude, shindo]`.
pub async fn refresh_column(State(state): AppStateRef) -> Json<Vec<Value>> {
    if let Err(e) = refresh::column(&state.client, &state.config, &state.column_store).await {
        tracing::warn!(error = %e, "column store refresh failed");
    }

    let rows = or_empty(
        state.column_store.query_all(OrderBy::NewestFirst, &QueryFilter::default()).await,
        "column store query",
    );

    Json(
        rows.iter()
            .map(|q| json!([q.date, q.time, q.epicenter, q.magnitude, q.intensity]))
            .collect(),
    )
}

pub async fn refresh_global(State(state): AppStateRef) -> Json<Value> {
    let refreshed = refresh_global_table(&state).await;
    let (quakes, recent) = fresh_global(&state, refreshed).await;

    Json(json!({ "global_quakes": quakes, "recent_global": recent }))
}

pub async fn refresh_jp(State(state): AppStateRef) -> Json<Value> {
    let refreshed = refresh_jp_table(&state).await;
    let (quakes, recent) = fresh_jp(&state, refreshed).await;

    Json(json!({ "jp_quakes": quakes, "recent_jp": recent }))
}

pub async fn jp_coordinates(State(state): AppStateRef) -> Json<Vec<JpQuake>> {
    Json(or_empty(
        state.warehouse.query_jp(OrderBy::NewestFirst, &QueryFilter::located()).await,
        "JP coordinates query",
    ))
}

pub async fn global_coordinates(State(state): AppStateRef) -> Json<Vec<GlobalQuake>> {
    Json(or_empty(
        state.warehouse.query_global(OrderBy::NewestFirst, &QueryFilter::default()).await,
        "global coordinates query",
    ))
}

fn count(n: i64) -> Json<Value> {
    Json(json!({ "count": n }))
}

pub async fn count_global(State(state): AppStateRef) -> Json<Value> {
    count(or_empty(state.warehouse.count_global(&QueryFilter::default()).await, "global count"))
}

pub async fn count_jp(State(state): AppStateRef) -> Json<Value> {
    count(or_empty(state.warehouse.count_jp(&QueryFilter::located()).await, "JP count"))
}

pub async fn count_significant_global(State(state): AppStateRef) -> Json<Value> {
    let filter = QueryFilter::default().significant();
    count(or_empty(state.warehouse.count_global(&filter).await, "significant global count"))
}

pub async fn count_significant_jp(State(state): AppStateRef) -> Json<Value> {
    let filter = QueryFilter::located().significant();
    count(or_empty(state.warehouse.count_jp(&filter).await, "significant JP count"))
}
