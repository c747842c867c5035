//! Export the monthly global feed to CSV and optionally push it to the stage.

use std::path::Path;

use anyhow::{Context, Result};

use crate::{
    cli::create_spinner,
    config::Config,
    csv_export,
    download::build_client,
    feed,
    quake::global::EXPORT_CUTOFF,
    upload,
};

/// Exit code for a failed download or write.
pub const EXIT_FETCH: u8 = 1;
/// Exit code for a failed stage upload.
pub const EXIT_UPLOAD: u8 = 2;

pub async fn export(config: &Config, output: &Path, upload_stage: bool, gzip: bool) -> Result<String> {
    let client = build_client(config.http_timeout())?;

    let bar = create_spinner("Downloading monthly feed...".to_string());
    let features = feed::fetch_global_features(&client, &config.monthly_feed_url, EXPORT_CUTOFF, &bar)
        .await
        .context("monthly feed download failed")?;
    bar.finish_with_message(format!("{} events at M{EXPORT_CUTOFF}+", features.len()));

    csv_export::save_features(&features, output)
        .with_context(|| format!("could not write `{}`", output.display()))?;

    if !upload_stage {
        return Ok(output.to_string_lossy().to_string());
    }

    let stage = config.stage()?;
    let bar = create_spinner("Uploading to stage...".to_string());
    let url = upload::upload_file(&client, &stage, output, gzip).await?;
    bar.finish_with_message("Uploaded");

    Ok(url)
}

/// Maps an export failure to its exit code.
pub fn exit_code(error: &anyhow::Error) -> u8 {
    if error.downcast_ref::<crate::error::UploadError>().is_some() {
        EXIT_UPLOAD
    } else {
        EXIT_FETCH
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{config::test::config_for, quake::global::test::feed_fixture};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer, dir: &TempDir) -> Config {
        let db = |name: &str| format!("sqlite://{}", dir.path().join(name).to_string_lossy());
        config_for(&server.uri(), db("w.sqlite"), db("c.sqlite"))
    }

    #[tokio::test]
    async fn should_write_csv_without_upload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed/all_month.geojson"))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed_fixture()))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("all_month.csv");

        export(&test_config(&server, &dir), &output, false, false).await.unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().nth(1).unwrap().starts_with("us1,"));
    }

    #[tokio::test]
    async fn should_exit_1_on_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();

        let err = export(&test_config(&server, &dir), &dir.path().join("x.csv"), false, false)
            .await
            .unwrap_err();

        assert_eq!(exit_code(&err), EXIT_FETCH);
    }

    #[tokio::test]
    async fn should_exit_2_without_stage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed_fixture()))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&server, &dir);
        config.stage_url = None;

        let err = export(&config, &dir.path().join("x.csv"), true, true).await.unwrap_err();

        assert_eq!(exit_code(&err), EXIT_UPLOAD);
    }

    #[tokio::test]
    async fn should_upload_gzipped_csv() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed/all_month.geojson"))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed_fixture()))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/stage/x.csv.gz"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&server, &dir);
        config.stage_url = Some(format!("{}/stage", server.uri()));

        let url = export(&config, &dir.path().join("x.csv"), true, true).await.unwrap();

        assert!(url.ends_with("/stage/x.csv.gz"));
    }
}
