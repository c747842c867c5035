//! Client for the hosted data agent's streaming run endpoint.

pub mod analysis;
pub mod events;
pub mod session;

use std::{collections::VecDeque, fmt};

use futures::{stream::BoxStream, StreamExt};
use reqwest::Client;
use serde::Serialize;

use crate::error::AgentError;

pub use analysis::summarize;
pub use events::{AgentEvent, Message, SseFrame, SseParser};
pub use session::ChatSession;

pub const REQUEST_ID_HEADER: &str = "X-Snowflake-Request-Id";

#[derive(Clone)]
pub struct AgentConfig {
    /// Account host, or a full `http(s)://` base URL.
    pub host: String,
    pub token: String,
    pub database: String,
    pub schema: String,
    pub agent: String,
    pub model: String,
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("host", &self.host)
            .field("token", &"***")
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("agent", &self.agent)
            .field("model", &self.model)
            .finish()
    }
}

impl AgentConfig {
    pub fn new(
        host: Option<String>,
        token: Option<String>,
        database: String,
        schema: String,
        agent: String,
        model: String,
    ) -> Result<Self, AgentError> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        Ok(AgentConfig {
            host: present(host).ok_or(AgentError::NotConfigured("QUAKEWATCH_AGENT_HOST"))?,
            token: present(token).ok_or(AgentError::NotConfigured("QUAKEWATCH_AGENT_PAT"))?,
            database,
            schema,
            agent,
            model,
        })
    }

    pub fn run_url(&self) -> String {
        let base = if self.host.starts_with("http://") || self.host.starts_with("https://") {
            self.host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", self.host.trim_end_matches('/'))
        };

        format!(
            "{base}/api/v2/databases/{}/schemas/{}/agents/{}:run",
            self.database, self.schema, self.agent
        )
    }
}

#[derive(Serialize)]
struct RunRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Debug, Clone)]
pub struct AgentClient {
    client: Client,
    config: AgentConfig,
}

impl AgentClient {
    pub fn new(client: Client, config: AgentConfig) -> Self {
        AgentClient { client, config }
    }

    /// Starts a run over the whole conversation and returns the open stream.
    pub async fn run(&self, messages: &[Message]) -> Result<AgentRun, AgentError> {
        let url = self.config.run_url();
        tracing::debug!(url = %url, messages = messages.len(), "starting agent run");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&RunRequest {
                model: &self.config.model,
                messages,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Status { status, body });
        }

        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(AgentRun {
            request_id,
            stream: response.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec())).boxed(),
            parser: Some(SseParser::default()),
            ready: VecDeque::new(),
        })
    }
}

/// An in-flight run. Frames are yielded as soon as they are complete.
pub struct AgentRun {
    pub request_id: Option<String>,
    stream: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    parser: Option<SseParser>,
    ready: VecDeque<SseFrame>,
}

impl AgentRun {
    pub async fn next_frame(&mut self) -> Result<Option<SseFrame>, AgentError> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Ok(Some(frame));
            }
            if self.parser.is_none() {
                return Ok(None);
            }

            match self.stream.next().await {
                Some(chunk) => {
                    let chunk = chunk?;
                    if let Some(parser) = self.parser.as_mut() {
                        self.ready.extend(parser.feed(&chunk));
                    }
                }
                None => {
                    if let Some(parser) = self.parser.take() {
                        self.ready.extend(parser.finish());
                    }
                }
            }
        }
    }
}

// -- Tests -------------------------------------------------------------------
