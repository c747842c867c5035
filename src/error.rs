//! Error taxonomy shared by the fetch, parse, storage and upload layers.

use reqwest::StatusCode;
use thiserror::Error;

/// Whole-request failures when retrieving a feed or page.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to `{url}` failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to `{url}` returned {status}")]
    Status { url: String, status: StatusCode },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// The feed or page did not have the structure we extract from.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] serde_json::Error),

    #[error("feed has no `features` array")]
    MissingFeatures,

    #[error("listing table not found")]
    MissingListingTable,

    #[error("detail table not found")]
    MissingDetailTable,

    #[error("no coordinates in detail page")]
    MissingCoordinates,
}

/// Connection or statement failure in a storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("column store refresh stopped after {written} rows: {source}")]
    Partial {
        written: usize,
        #[source]
        source: sqlx::Error,
    },
}

/// Failure pushing an export file to the remote stage.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("stage upload is not configured (set QUAKEWATCH_STAGE_URL)")]
    NotConfigured,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("stage returned {0}")]
    Status(StatusCode),
}

/// Failure starting or reading an agent run.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("agent setting `{0}` is not configured")]
    NotConfigured(&'static str),

    #[error("agent request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("agent returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// A refresh is a fetch followed by a load; either half can fail.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
