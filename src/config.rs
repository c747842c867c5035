//! Process-wide settings, read once from flags and the environment.

use std::time::Duration;

use clap::Args;

use crate::{
    agent::AgentConfig,
    db,
    error::{AgentError, UploadError},
    upload::Stage,
};

#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Warehouse SQLite URL [default: platform data dir]
    #[arg(long, env = "QUAKEWATCH_WAREHOUSE_URL", global = true)]
    pub warehouse_url: Option<String>,

    /// Column store SQLite URL [default: platform data dir]
    #[arg(long, env = "QUAKEWATCH_COLUMN_URL", global = true)]
    pub column_url: Option<String>,

    #[arg(
        long,
        env = "QUAKEWATCH_GLOBAL_FEED_URL",
        default_value = "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_week.geojson",
        global = true
    )]
    pub global_feed_url: String,

    #[arg(
        long,
        env = "QUAKEWATCH_MONTHLY_FEED_URL",
        default_value = "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_month.geojson",
        global = true
    )]
    pub monthly_feed_url: String,

    #[arg(
        long,
        env = "QUAKEWATCH_JP_LIST_URL",
        default_value = "https://typhoon.yahoo.co.jp/weather/jp/earthquake/list/",
        global = true
    )]
    pub jp_list_url: String,

    /// Base that relative detail links are resolved against
    #[arg(
        long,
        env = "QUAKEWATCH_JP_BASE_URL",
        default_value = "https://typhoon.yahoo.co.jp/",
        global = true
    )]
    pub jp_base_url: String,

    #[arg(long, env = "QUAKEWATCH_HTTP_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub http_timeout_secs: u64,

    #[arg(long, env = "QUAKEWATCH_STAGE_URL", global = true)]
    pub stage_url: Option<String>,

    #[arg(long, env = "QUAKEWATCH_STAGE_TOKEN", hide_env_values = true, global = true)]
    pub stage_token: Option<String>,

    #[arg(long, env = "QUAKEWATCH_AGENT_HOST", global = true)]
    pub agent_host: Option<String>,

    #[arg(long, env = "QUAKEWATCH_AGENT_PAT", hide_env_values = true, global = true)]
    pub agent_pat: Option<String>,

    #[arg(long, env = "QUAKEWATCH_AGENT_DATABASE", default_value = "QUAKEWATCH_DB", global = true)]
    pub agent_database: String,

    #[arg(long, env = "QUAKEWATCH_AGENT_SCHEMA", default_value = "GLOBAL", global = true)]
    pub agent_schema: String,

    #[arg(long, env = "QUAKEWATCH_AGENT_NAME", default_value = "QUAKEWATCH_CHAT", global = true)]
    pub agent_name: String,

    #[arg(long, env = "QUAKEWATCH_AGENT_MODEL", default_value = "claude-4-sonnet", global = true)]
    pub agent_model: String,
}

impl Config {
    pub fn warehouse_url(&self) -> String {
        self.warehouse_url.clone().unwrap_or_else(|| db::default_url("warehouse"))
    }

    pub fn column_url(&self) -> String {
        self.column_url.clone().unwrap_or_else(|| db::default_url("column"))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn stage(&self) -> Result<Stage, UploadError> {
        Stage::from_parts(self.stage_url.clone(), self.stage_token.clone())
    }

    pub fn agent(&self) -> Result<AgentConfig, AgentError> {
        AgentConfig::new(
            self.agent_host.clone(),
            self.agent_pat.clone(),
            self.agent_database.clone(),
            self.agent_schema.clone(),
            self.agent_name.clone(),
            self.agent_model.clone(),
        )
    }
}

// -- Tests -------------------------------------------------------------------
