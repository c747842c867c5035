//! Retrieves feed bodies and pages over HTTP.

use std::time::Duration;

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;

use crate::error::FetchError;

const USER_AGENT: &str = concat!("quakewatch/", env!("CARGO_PKG_VERSION"));

/// Upper bound on the buffer reserved from a server-declared content length.
const MAX_PREALLOC: u64 = 8 << 20;

/// Builds the shared client. Per-request timeouts are the only retry/cancel
/// policy applied to fetches.
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().user_agent(USER_AGENT).timeout(timeout).build()
}

/// GETs `url` and returns the body as text. Non-success statuses are errors.
pub async fn fetch_text(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = send(client, url).await?;

    response.text().await.map_err(|source| FetchError::Request {
        url: url.to_string(),
        source,
    })
}

/// Like [`fetch_text`] but reports bytes received on `progress_bar`, switching
/// it from a spinner to a byte bar when the server sends a content length.
pub async fn fetch_text_with_progress(
    client: &Client,
    url: &str,
    progress_bar: &ProgressBar,
) -> Result<String, FetchError> {
    let response = send(client, url).await?;

    let total_size = response.content_length().unwrap_or(0);
    if total_size > 0 {
        progress_bar.set_length(total_size);
        if let Ok(style) =
            ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {eta}")
        {
            progress_bar.set_style(style.progress_chars("=> "));
        }
    }

    let mut body = Vec::with_capacity(initial_capacity(total_size));
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        body.extend_from_slice(&chunk);
        progress_bar.set_position(body.len() as u64);
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

fn initial_capacity(content_length: u64) -> usize {
    usize::try_from(content_length.min(MAX_PREALLOC)).unwrap_or(0)
}

async fn send(client: &Client, url: &str) -> Result<reqwest::Response, FetchError> {
    tracing::debug!(url, "GET");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }

    Ok(response)
}

// -- Tests -------------------------------------------------------------------
