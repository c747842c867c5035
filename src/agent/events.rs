//! Server-sent-event framing and the agent's event payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Incremental SSE decoder. Feed it raw bytes as they arrive; complete
/// frames come out on every blank line.
#[derive(Debug, Default)]
pub struct SseParser {
    pending: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.pending.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            if let Some(frame) = self.line(line.trim_end_matches('\r')) {
                frames.push(frame);
            }
        }

        frames
    }

    /// Flushes whatever is left once the stream has ended.
    pub fn finish(mut self) -> Option<SseFrame> {
        if !self.pending.is_empty() {
            let rest = String::from_utf8_lossy(&std::mem::take(&mut self.pending)).into_owned();
            if let Some(frame) = self.line(rest.trim_end_matches('\r')) {
                return Some(frame);
            }
        }
        self.dispatch()
    }

    fn line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.trim_start()),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }

        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        if self.data.is_empty() && self.event.is_none() {
            return None;
        }
        let event = self.event.take().unwrap_or_else(|| "message".to_string());
        let data = std::mem::take(&mut self.data).join("\n");

        Some(SseFrame { event, data })
    }
}

// -- Conversation -----------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: Vec<ContentItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message {
            role: "user".to_string(),
            content: vec![ContentItem::text(text)],
            metadata: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Message {
            role: "assistant".to_string(),
            content: vec![ContentItem::text(text)],
            metadata: None,
        }
    }

    /// Text items joined with newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentItem::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A content item keeps every field it arrived with so that history sent
/// back to the agent is unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("text".to_string(), Value::String(text.into()));
        ContentItem {
            kind: "text".to_string(),
            fields,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        if self.kind != "text" {
            return None;
        }
        self.fields.get("text").and_then(Value::as_str)
    }
}

// -- Event payloads ---------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusEventData {
    #[serde(default)]
    pub status: Option<String>,
    pub message: String,
}

/// Payload of both `response.text.delta` and `response.thinking.delta`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeltaEventData {
    pub content_index: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThinkingEventData {
    pub content_index: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolUseEventData {
    pub content_index: usize,
    #[serde(default)]
    pub tool_use_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub input: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolResultEventData {
    pub content_index: usize,
    #[serde(default)]
    pub tool_use_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub content: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChartEventData {
    pub content_index: usize,
    /// Vega-Lite spec as a JSON string.
    pub chart_spec: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableEventData {
    pub content_index: usize,
    pub result_set: ResultSet,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
    #[serde(rename = "resultSetMetaData", alias = "result_set_meta_data")]
    pub meta_data: ResultSetMetaData,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultSetMetaData {
    #[serde(rename = "rowType", alias = "row_type", default)]
    pub row_type: Vec<ColumnType>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnType {
    pub name: String,
}

impl TableEventData {
    pub fn column_names(&self) -> Vec<&str> {
        self.result_set
            .meta_data
            .row_type
            .iter()
            .map(|c| c.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorEventData {
    #[serde(default)]
    pub code: Value,
    pub message: String,
}

impl ErrorEventData {
    pub fn code_text(&self) -> String {
        match &self.code {
            Value::Null => "unknown".to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Every event the agent stream can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Status(StatusEventData),
    TextDelta(DeltaEventData),
    ThinkingDelta(DeltaEventData),
    Thinking(ThinkingEventData),
    ToolUse(ToolUseEventData),
    ToolResult(ToolResultEventData),
    Chart(ChartEventData),
    Table(TableEventData),
    Error(ErrorEventData),
    Response(Message),
    /// Known tag whose payload did not decode.
    Malformed { event: String, data: String, reason: String },
    Unknown { event: String, data: String },
}

impl AgentEvent {
    pub fn from_frame(frame: &SseFrame) -> Self {
        let data = frame.data.as_str();
        let decoded = match frame.event.as_str() {
            "response.status" => serde_json::from_str(data).map(AgentEvent::Status),
            "response.text.delta" => serde_json::from_str(data).map(AgentEvent::TextDelta),
            "response.thinking.delta" => serde_json::from_str(data).map(AgentEvent::ThinkingDelta),
            "response.thinking" => serde_json::from_str(data).map(AgentEvent::Thinking),
            "response.tool_use" => serde_json::from_str(data).map(AgentEvent::ToolUse),
            "response.tool_result" => serde_json::from_str(data).map(AgentEvent::ToolResult),
            "response.chart" => serde_json::from_str(data).map(AgentEvent::Chart),
            "response.table" => serde_json::from_str(data).map(AgentEvent::Table),
            "error" => serde_json::from_str(data).map(AgentEvent::Error),
            "response" => {
                let message = serde_json::from_str(data).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "undecodable response, keeping raw text");
                    Message::assistant(data)
                });
                return AgentEvent::Response(message);
            }
            other => {
                return AgentEvent::Unknown {
                    event: other.to_string(),
                    data: frame.data.clone(),
                }
            }
        };

        decoded.unwrap_or_else(|e| AgentEvent::Malformed {
            event: frame.event.clone(),
            data: frame.data.clone(),
            reason: e.to_string(),
        })
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Splits a complete SSE body into frames.
    pub fn parse_sse(body: &str) -> Vec<SseFrame> {
        let mut parser = SseParser::default();
        let mut frames = parser.feed(body.as_bytes());
        frames.extend(parser.finish());

        frames
    }

    pub fn stream_fixture() -> String {
        [
            ": keep-alive",
            "event: response.status",
            r#"data: {"status":"planning","message":"Planning the next steps"}"#,
            "",
            "event: response.text.delta",
            r#"data: {"content_index":0,"text":"Three "}"#,
            "",
            "event: response.text.delta",
            r#"data: {"content_index":0,"text":"quakes."}"#,
            "",
            "event: response",
            r#"data: {"role":"assistant","content":[{"type":"text","text":"Three quakes."}]}"#,
            "",
        ]
        .join("\n")
    }

    #[test]
    fn should_split_frames_and_skip_comments() {
        let frames = parse_sse(&stream_fixture());

        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0].event, "response.status");
        assert_eq!(frames[3].event, "response");
    }

    #[test]
    fn should_join_multiline_data_and_default_event_name() {
        let frames = parse_sse("data: a\ndata: b\n\ndata:c");

        assert_eq!(
            frames,
            vec![
                SseFrame {
                    event: "message".to_string(),
                    data: "a\nb".to_string()
                },
                SseFrame {
                    event: "message".to_string(),
                    data: "c".to_string()
                },
            ]
        );
    }

    #[test]
    fn should_reassemble_lines_across_chunks() {
        let mut parser = SseParser::default();
        assert!(parser.feed(b"event: resp").is_empty());
        assert!(parser.feed(b"onse.status\r\ndata: {\"mess").is_empty());
        let frames = parser.feed(b"age\":\"ok\"}\r\n\r\n");

        assert_eq!(frames.len(), 1);
        assert_eq!(
            AgentEvent::from_frame(&frames[0]),
            AgentEvent::Status(StatusEventData {
                status: None,
                message: "ok".to_string()
            })
        );
        assert!(parser.finish().is_none());
    }

    #[test]
    fn should_decode_known_events() {
        let frames = parse_sse(&stream_fixture());
        let events: Vec<AgentEvent> = frames.iter().map(AgentEvent::from_frame).collect();

        assert!(matches!(&events[1], AgentEvent::TextDelta(d) if d.text == "Three "));
        assert!(matches!(&events[3], AgentEvent::Response(m) if m.text() == "Three quakes."));
    }

    #[test]
    fn should_decode_table_event() {
        let frame = SseFrame {
            event: "response.table".to_string(),
            data: r#"{"content_index":2,"result_set":{"data":[["2024-03-05","4.9"]],
                "resultSetMetaData":{"rowType":[{"name":"DATE"},{"name":"MAGNITUDE"}]}}}"#
                .to_string(),
        };

        match AgentEvent::from_frame(&frame) {
            AgentEvent::Table(table) => {
                assert_eq!(table.column_names(), vec!["DATE", "MAGNITUDE"]);
                assert_eq!(table.result_set.data[0][1], Value::String("4.9".to_string()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn should_mark_bad_payload_as_malformed() {
        let frame = SseFrame {
            event: "response.tool_result".to_string(),
            data: "not json".to_string(),
        };

        assert!(matches!(
            AgentEvent::from_frame(&frame),
            AgentEvent::Malformed { event, .. } if event == "response.tool_result"
        ));
    }

    #[test]
    fn should_fall_back_to_raw_response_text() {
        let frame = SseFrame {
            event: "response".to_string(),
            data: "plain words".to_string(),
        };

        assert_eq!(AgentEvent::from_frame(&frame), AgentEvent::Response(Message::assistant("plain words")));
    }

    #[test]
    fn should_keep_unknown_tags() {
        let frame = SseFrame {
            event: "response.annotation".to_string(),
            data: "{}".to_string(),
        };

        assert!(matches!(AgentEvent::from_frame(&frame), AgentEvent::Unknown { .. }));
    }

    #[test]
    fn should_preserve_unknown_content_fields() {
        let raw = r#"{"role":"assistant","content":[{"type":"tool_use","tool_use":{"name":"sql"}}]}"#;
        let message: Message = serde_json::from_str(raw).unwrap();

        assert_eq!(message.text(), "");
        assert_eq!(serde_json::to_value(&message).unwrap(), serde_json::from_str::<Value>(raw).unwrap());
    }

    #[test]
    fn should_render_error_code() {
        let error: ErrorEventData = serde_json::from_str(r#"{"code":"399504","message":"bad"}"#).unwrap();
        assert_eq!(error.code_text(), "399504");
    }
}
