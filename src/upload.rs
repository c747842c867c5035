//! Pushes an export file to the remote stage with an HTTP PUT.

use std::{fs, io::Write, path::Path};

use flate2::{write::GzEncoder, Compression};
use reqwest::{header, Client};

use crate::error::UploadError;

/// Where exports are uploaded to.
#[derive(Debug, Clone)]
pub struct Stage {
    pub url: String,
    pub token: Option<String>,
}

impl Stage {
    pub fn from_parts(url: Option<String>, token: Option<String>) -> Result<Self, UploadError> {
        let url = url.filter(|u| !u.trim().is_empty()).ok_or(UploadError::NotConfigured)?;
        Ok(Stage { url, token })
    }

    fn object_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), file_name)
    }
}

/// Uploads `local_path` to the stage, gzip-compressed when `gzip` is set.
/// Returns the URL the file was stored at.
pub async fn upload_file(client: &Client, stage: &Stage, local_path: &Path, gzip: bool) -> Result<String, UploadError> {
    let file_name = local_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export.csv".to_string());

    let raw = fs::read(local_path)?;
    let (body, file_name, content_type) = if gzip {
        (compress(&raw)?, format!("{file_name}.gz"), "application/gzip")
    } else {
        (raw, file_name, "text/csv")
    };

    let url = stage.object_url(&file_name);
    let mut request = client
        .put(&url)
        .header(header::CONTENT_TYPE, content_type)
        .body(body);
    if let Some(token) = &stage.token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(UploadError::Status(response.status()));
    }

    tracing::info!(url = %url, "uploaded to stage");
    Ok(url)
}

fn compress(data: &[u8]) -> Result<Vec<u8>, UploadError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

// -- Tests -------------------------------------------------------------------
