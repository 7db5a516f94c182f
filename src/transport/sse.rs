//! Server-Sent Events parsing for streaming HTTP responses.
//!
//! Implements the EventSource line convention: `:`-prefixed comment lines
//! are ignored, a blank line flushes the accumulated event (only if it
//! carried `data:` content), and multiple `data:` lines join with `\n`.

use serde_json::Value;
use tracing::debug;

/// One decoded SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the last `event:` line, if any.
    pub event: Option<String>,
    /// Joined `data:` payload.
    pub data: String,
    /// Value of the last `id:` line, if any.
    pub id: Option<String>,
}

/// Parses a sequence of lines into SSE events.
///
/// A trailing event without a terminating blank line is still flushed.
pub fn parse_sse_stream<'a, I>(lines: I) -> Vec<SseEvent>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut events = Vec::new();
    let mut event_type: Option<String> = None;
    let mut data_buffer: Vec<String> = Vec::new();
    let mut event_id: Option<String> = None;

    for raw_line in lines {
        let line = raw_line.trim_end_matches(['\r', '\n']);

        if line.starts_with(':') {
            continue;
        }

        if line.is_empty() {
            if !data_buffer.is_empty() {
                events.push(SseEvent {
                    event: event_type.take(),
                    data: data_buffer.join("\n"),
                    id: event_id.take(),
                });
            }
            event_type = None;
            data_buffer.clear();
            event_id = None;
            continue;
        }

        if let Some(rest) = line.strip_prefix("data:") {
            data_buffer.push(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("event:") {
            event_type = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("id:") {
            event_id = Some(rest.trim().to_string());
        }
    }

    if !data_buffer.is_empty() {
        events.push(SseEvent {
            event: event_type,
            data: data_buffer.join("\n"),
            id: event_id,
        });
    }

    events
}

/// Parses an SSE body and yields only the events whose data decodes as
/// JSON; malformed data is logged at debug level and dropped.
pub fn parse_sse_json_stream<'a, I>(lines: I) -> Vec<Value>
where
    I: IntoIterator<Item = &'a str>,
{
    parse_sse_stream(lines)
        .into_iter()
        .filter_map(|event| match serde_json::from_str(&event.data) {
            Ok(value) => Some(value),
            Err(_) => {
                let preview: String = event.data.chars().take(200).collect();
                debug!("SSE event data is not valid JSON: {preview}");
                None
            }
        })
        .collect()
}
