use std::cell::RefCell;
use std::fmt::Write as _;

use serde::Serialize;

use crate::callback::Outcome;
use crate::engine::{EngineConfig, Http1Engine};
use crate::error::Error;
use crate::event::EventKind;
use crate::instance::Instance;
use crate::parser::{Handler, Parser};
use crate::types::{HttpMethod, MessageType};

// ---------------------------------------------------------------------------
// Transcript types
// ---------------------------------------------------------------------------

/// One event as seen by a [`Recorder`]. Data fragments of the same kind that
/// arrive back to back are merged, so the transcript does not depend on how
/// the input was split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub event: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Start-line metadata captured when a message's headers complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    pub version: String,
    /// `0` for requests.
    pub status: u16,
    pub upgrade: bool,
    pub keep_alive: bool,
}

/// Everything one run over an input produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub message_type: MessageType,
    pub offered: usize,
    pub consumed: usize,
    pub messages: Vec<MessageSummary>,
    pub events: Vec<Entry>,
    pub error: Option<Error>,
}

impl Report {
    /// No error was recorded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// A [`Handler`] that writes down every event it receives.
#[derive(Debug, Default)]
pub struct Recorder {
    events: RefCell<Vec<(EventKind, Option<Vec<u8>>)>>,
    messages: RefCell<Vec<MessageSummary>>,
}

impl Recorder {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The transcript so far.
    pub fn entries(&self) -> Vec<Entry> {
        self.events
            .borrow()
            .iter()
            .map(|(event, data)| Entry {
                event: *event,
                data: data
                    .as_ref()
                    .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
            })
            .collect()
    }

    /// One summary per message whose headers completed.
    pub fn messages(&self) -> Vec<MessageSummary> {
        self.messages.borrow().clone()
    }

    fn push(&self, event: EventKind) -> Outcome {
        self.events.borrow_mut().push((event, None));
        Ok(())
    }

    fn append(&self, event: EventKind, data: &[u8]) -> Outcome {
        let mut events = self.events.borrow_mut();
        match events.last_mut() {
            Some((last, Some(bytes))) if *last == event => bytes.extend_from_slice(data),
            _ => events.push((event, Some(data.to_vec()))),
        }
        Ok(())
    }
}

impl Handler for Recorder {
    fn on_message_begin(&self, _inst: &mut Instance) -> Outcome {
        self.push(EventKind::MessageBegin)
    }

    fn on_url(&self, _inst: &mut Instance, data: &[u8]) -> Outcome {
        self.append(EventKind::Url, data)
    }

    fn on_status_complete(&self, _inst: &mut Instance) -> Outcome {
        self.push(EventKind::StatusComplete)
    }

    fn on_header_field(&self, _inst: &mut Instance, data: &[u8]) -> Outcome {
        self.append(EventKind::HeaderField, data)
    }

    fn on_header_value(&self, _inst: &mut Instance, data: &[u8]) -> Outcome {
        self.append(EventKind::HeaderValue, data)
    }

    fn on_headers_complete(&self, inst: &mut Instance) -> Outcome {
        self.messages.borrow_mut().push(MessageSummary {
            method: inst.http_method(),
            version: inst.http_version(),
            status: inst.http_status(),
            upgrade: inst.is_upgrade(),
            keep_alive: inst.should_keep_alive(),
        });
        self.push(EventKind::HeadersComplete)
    }

    fn on_body(&self, _inst: &mut Instance, data: &[u8]) -> Outcome {
        self.append(EventKind::Body, data)
    }

    fn on_message_complete(&self, _inst: &mut Instance) -> Outcome {
        self.push(EventKind::MessageComplete)
    }
}

// ---------------------------------------------------------------------------
// Running a whole input
// ---------------------------------------------------------------------------

/// Parse `data` as one stream, feeding it in pieces of `chunk_size` bytes
/// (all at once when `None` or `0`), then signal end of stream.
///
/// Feeding stops at the first error, or when an upgraded message leaves the
/// rest of the input unconsumed.
pub fn record(
    data: &[u8],
    message_type: MessageType,
    chunk_size: Option<usize>,
    config: EngineConfig,
) -> Report {
    let recorder = Recorder::new();
    let mut parser = Parser::with_engine(Http1Engine::with_config(config));
    parser.attach(&recorder);

    let mut inst = Instance::with_type(message_type);
    let size = chunk_size.filter(|&n| n > 0).unwrap_or(data.len()).max(1);

    let mut consumed = 0;
    for chunk in data.chunks(size) {
        let n = parser.execute(&mut inst, chunk);
        consumed += n;
        if inst.has_error() || n < chunk.len() {
            break;
        }
    }
    if consumed == data.len() {
        parser.finish(&mut inst);
    }
    tracing::debug!(consumed, offered = data.len(), ok = !inst.has_error(), "input recorded");

    drop(parser);
    Report {
        message_type,
        offered: data.len(),
        consumed,
        messages: recorder.messages(),
        events: recorder.entries(),
        error: inst.error().cloned(),
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Serialize a [`Report`] to a JSON string.
///
/// When `pretty` is `true` the output is indented for readability.
pub fn format_json(report: &Report, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(report).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    } else {
        serde_json::to_string(report).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

/// Render a [`Report`] in a human-readable debug format.
pub fn format_debug(report: &Report) -> String {
    let mut out = String::with_capacity(256);

    out.push_str("=== HTTP Stream ===\n");
    let _ = writeln!(out, "Type:     {}", report.message_type);
    let _ = writeln!(out, "Consumed: {} of {} bytes", report.consumed, report.offered);

    let _ = writeln!(out, "\n--- Messages ({}) ---", report.messages.len());
    for (n, message) in report.messages.iter().enumerate() {
        let start = match message.method {
            Some(method) => format!("{method} HTTP/{}", message.version),
            None => format!("HTTP/{} {}", message.version, message.status),
        };
        let _ = writeln!(
            out,
            "  #{n}: {start} (keep-alive: {}, upgrade: {})",
            message.keep_alive, message.upgrade
        );
    }

    let _ = writeln!(out, "\n--- Events ({}) ---", report.events.len());
    out.push_str(&format_events(report));

    match &report.error {
        Some(error) => {
            let _ = writeln!(out, "\n--- Error ---\n  {error}");
        }
        None => out.push_str("\n--- No Error ---\n"),
    }

    out.push_str("===================\n");
    out
}

/// One line per event: the event name, then the payload if it has one.
pub fn format_events(report: &Report) -> String {
    let mut out = String::with_capacity(report.events.len() * 24);
    for entry in &report.events {
        match &entry.data {
            Some(data) => {
                let _ = writeln!(out, "{} {:?}", entry.event, data);
            }
            None => {
                let _ = writeln!(out, "{}", entry.event);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    const REQUEST: &[u8] = b"POST /submit HTTP/1.1\r\nHost: a\r\nContent-Length: 2\r\n\r\nhi";

    #[test]
    fn split_fragments_are_merged() {
        let recorder = Recorder::new();
        recorder.append(EventKind::Url, b"/fo").unwrap();
        recorder.append(EventKind::Url, b"o").unwrap();
        recorder.push(EventKind::HeadersComplete).unwrap();
        recorder.append(EventKind::Body, b"x").unwrap();

        let entries = recorder.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].data.as_deref(), Some("/foo"));
        assert_eq!(entries[2].event, EventKind::Body);
    }

    #[test]
    fn chunk_size_does_not_change_the_report() {
        let whole = record(REQUEST, MessageType::Request, None, EngineConfig::default());
        let bytewise = record(REQUEST, MessageType::Request, Some(1), EngineConfig::default());
        assert!(whole.is_ok());
        assert_eq!(whole, bytewise);
        assert_eq!(whole.consumed, REQUEST.len());
    }

    #[test]
    fn summary_is_taken_at_headers_complete() {
        let report = record(REQUEST, MessageType::Both, Some(0), EngineConfig::default());
        assert_eq!(report.messages.len(), 1);
        let message = &report.messages[0];
        assert_eq!(message.method, Some(HttpMethod::POST));
        assert_eq!(message.version, "1.1");
        assert_eq!(message.status, 0);
        assert!(message.keep_alive);
    }

    #[test]
    fn errors_end_up_in_the_report() {
        let report = record(b"GETS / HTTP/1.1\r\n", MessageType::Request, None, EngineConfig::default());
        assert!(!report.is_ok());
        assert_eq!(report.consumed, 3);
        assert_eq!(report.error.as_ref().map(Error::kind), Some(ErrorKind::InvalidMethod));
    }

    #[test]
    fn events_format_one_per_line() {
        let report = record(b"GET /a HTTP/1.1\r\n\r\n", MessageType::Request, None, EngineConfig::default());
        assert_eq!(
            format_events(&report),
            "message_begin\nurl \"/a\"\nheaders_complete\nmessage_complete\n"
        );
    }

    #[test]
    fn json_names_events_and_errors() {
        let report = record(b"GET / HTTP/23\r\n", MessageType::Request, None, EngineConfig::default());
        let json = format_json(&report, false);
        assert!(json.contains("\"message_begin\""));
        assert!(json.contains("INVALID_VERSION"));
    }

    #[test]
    fn debug_format_lists_messages() {
        let report = record(REQUEST, MessageType::Request, None, EngineConfig::default());
        let text = format_debug(&report);
        assert!(text.contains("#0: POST HTTP/1.1"));
        assert!(text.contains("No Error"));
    }
}
