//! Summary of an agent event trace.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::events::{Message, SseFrame};

const SAMPLE_CHARS: usize = 300;
const MAX_LISTED: usize = 10;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    /// Frames seen per event tag.
    pub counts: BTreeMap<String, usize>,
    /// Leading characters of the first frames' data.
    pub samples: Vec<String>,
    /// Assistant text recovered from the payloads.
    pub assistant_texts: Vec<String>,
    /// Whitespace-separated words in the final responses.
    pub tokens: usize,
}

pub fn summarize(frames: &[SseFrame]) -> EventSummary {
    let mut summary = EventSummary::default();

    for frame in frames {
        *summary.counts.entry(frame.event.clone()).or_default() += 1;

        if summary.samples.len() < MAX_LISTED {
            summary.samples.push(frame.data.chars().take(SAMPLE_CHARS).collect());
        }

        summary.assistant_texts.extend(extract_texts(frame));

        if frame.event == "response" {
            if let Ok(message) = serde_json::from_str::<Message>(&frame.data) {
                if let Some(consumed) = tokens_consumed(&message) {
                    summary.assistant_texts.push(consumed);
                }
                summary.tokens += message.text().split_whitespace().count();
            }
        }
    }

    summary.assistant_texts.truncate(MAX_LISTED);
    summary
}

fn extract_texts(frame: &SseFrame) -> Vec<String> {
    if let Ok(message) = serde_json::from_str::<Message>(&frame.data) {
        return vec![message.text()];
    }

    match serde_json::from_str::<Value>(&frame.data) {
        Ok(value) => {
            let mut texts = Vec::new();
            collect_text_fields(&value, &mut texts);
            texts.retain(|t| !t.is_empty());
            texts
        }
        Err(_) if frame.event == "response" => vec![frame.data.clone()],
        Err(_) => Vec::new(),
    }
}

fn collect_text_fields(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                match (key.as_str(), v) {
                    ("text", Value::String(s)) => out.push(s.clone()),
                    _ => collect_text_fields(v, out),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_text_fields(v, out)),
        _ => {}
    }
}

fn tokens_consumed(message: &Message) -> Option<String> {
    let metadata = match message.metadata.as_ref()? {
        Value::String(raw) => serde_json::from_str(raw).ok()?,
        other => other.clone(),
    };
    let consumed = metadata.get("usage")?.get("tokens_consumed")?;

    (!consumed.is_null()).then(|| consumed.to_string())
}

// -- Tests -------------------------------------------------------------------
