//! Interactive chat with the hosted data agent.

use std::io::{self, Write};

use anyhow::Result;
use indicatif::ProgressBar;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    agent::{
        events::TableEventData, session::Flow, summarize, AgentClient, AgentEvent, ChatSession, SseFrame,
    },
    cli::create_spinner,
    config::Config,
    download::build_client,
};

pub async fn chat(config: &Config, trace: bool) -> Result<()> {
    let agent = AgentClient::new(build_client(config.http_timeout())?, config.agent()?);
    let mut session = ChatSession::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if matches!(prompt, "exit" | "quit") {
            break;
        }

        session.push_user(prompt);
        if let Err(e) = ask(&agent, &mut session, trace).await {
            eprintln!("Error: {e}");
            session.discard_last_question();
        }
    }

    Ok(())
}

async fn ask(agent: &AgentClient, session: &mut ChatSession, trace: bool) -> Result<()> {
    let spinner = create_spinner("Sending request...".to_string());
    let mut run = agent.run(session.messages()).await?;
    if let Some(id) = &run.request_id {
        spinner.println(format!("request_id: {id}"));
    }
    spinner.set_message("Waiting for response...");

    let mut renderer = Renderer::new(io::stdout(), spinner);
    let mut frames: Vec<SseFrame> = Vec::new();

    while let Some(frame) = run.next_frame().await? {
        let event = AgentEvent::from_frame(&frame);
        if trace {
            frames.push(frame);
        }

        renderer.render(&event)?;
        if session.apply(&event) == Flow::Stop {
            break;
        }
    }
    renderer.finish()?;

    if trace {
        println!("{}", serde_json::to_string_pretty(&summarize(&frames))?);
    }

    Ok(())
}

/// Writes streamed events to a terminal.
struct Renderer<W: Write> {
    out: W,
    spinner: ProgressBar,
    streaming: bool,
}

impl<W: Write> Renderer<W> {
    fn new(out: W, spinner: ProgressBar) -> Self {
        Renderer {
            out,
            spinner,
            streaming: false,
        }
    }

    fn start_output(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }

    fn render(&mut self, event: &AgentEvent) -> io::Result<()> {
        match event {
            AgentEvent::Status(status) => {
                self.spinner.set_message(status.message.clone());
            }
            AgentEvent::TextDelta(delta) => {
                self.start_output();
                self.streaming = true;
                write!(self.out, "{}", delta.text)?;
                self.out.flush()?;
            }
            AgentEvent::ThinkingDelta(delta) => {
                self.spinner.set_message(format!("Thinking: {}", last_line(&delta.text)));
            }
            AgentEvent::Thinking(_) => {
                self.spinner.set_message("Thinking done");
            }
            AgentEvent::ToolUse(tool) => {
                self.start_output();
                writeln!(
                    self.out,
                    "[tool use] {} {}",
                    tool.name.as_deref().unwrap_or("?"),
                    tool.input
                )?;
            }
            AgentEvent::ToolResult(result) => {
                self.start_output();
                writeln!(self.out, "[tool result] {}", result.status.as_deref().unwrap_or("done"))?;
            }
            AgentEvent::Chart(chart) => {
                self.start_output();
                writeln!(self.out, "[chart] Vega-Lite spec, {} bytes", chart.chart_spec.len())?;
            }
            AgentEvent::Table(table) => {
                self.start_output();
                write_table(&mut self.out, table)?;
            }
            AgentEvent::Error(error) => {
                self.start_output();
                writeln!(self.out, "Error: {} (code: {})", error.message, error.code_text())?;
            }
            AgentEvent::Response(message) => {
                self.start_output();
                if !self.streaming {
                    write!(self.out, "{}", message.text())?;
                }
                writeln!(self.out)?;
                self.streaming = false;
            }
            AgentEvent::Malformed { event, data, reason } => {
                tracing::warn!(event = %event, reason = %reason, "undecodable agent event");
                self.start_output();
                writeln!(self.out, "[{event} (raw)] {data}")?;
            }
            AgentEvent::Unknown { event, .. } => {
                tracing::debug!(event = %event, "ignoring unknown agent event");
            }
        }

        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.start_output();
        if self.streaming {
            writeln!(self.out)?;
        }
        self.out.flush()
    }
}

fn write_table<W: Write>(out: &mut W, table: &TableEventData) -> io::Result<()> {
    writeln!(out, "{}", table.column_names().join("\t"))?;
    for row in &table.result_set.data {
        let cells: Vec<String> = row
            .iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect();
        writeln!(out, "{}", cells.join("\t"))?;
    }

    Ok(())
}

fn last_line(text: &str) -> &str {
    text.lines().last().unwrap_or("").trim()
}

// -- Tests -------------------------------------------------------------------
