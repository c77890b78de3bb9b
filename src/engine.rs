use serde::{Deserialize, Serialize};

use crate::callback::{ABORT, STOP};
use crate::error::Errno;
use crate::event::EventKind;
use crate::instance::{Instance, flags};
use crate::settings::Settings;
use crate::types::{HttpMethod, MessageType};

// ---------------------------------------------------------------------------
// Engine boundary
// ---------------------------------------------------------------------------

/// An incremental HTTP message parser driven through a [`Settings`] table.
///
/// `execute` consumes `data` against the progress stored in `inst`, calling
/// the registered callbacks synchronously as events are recognized, and
/// returns the number of bytes consumed. Grammar failures are reported by
/// setting `inst.raw().errno`; an empty `data` slice signals end of stream.
pub trait Engine {
    fn execute(&self, inst: &mut Instance, settings: &Settings<'_>, data: &[u8]) -> usize;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Limits applied by [`Http1Engine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum size of the start line plus header section (default: 80 KiB).
    pub max_header_size: u32,
    /// Largest accepted `Content-Length` value (default: unlimited).
    pub max_content_length: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_header_size: 80 * 1024,
            max_content_length: u64::MAX,
        }
    }
}

// ---------------------------------------------------------------------------
// Session progress
// ---------------------------------------------------------------------------

/// Position of [`Http1Engine`] within the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum State {
    /// A message closed the connection; only whitespace may follow.
    Dead,
    /// Between messages.
    #[default]
    Start,
    /// `Both` mode saw `H`: `HTTP/` or `HEAD`.
    ResOrReqH,

    // ---- Start line ----
    Method,
    UrlStart,
    Url,
    Http,
    MajorFirst,
    Major,
    MinorFirst,
    Minor,
    StatusFirst,
    Status,
    StatusText,
    LineLf,

    // ---- Header section ----
    HeaderStart,
    HeaderField,
    HeaderValueOws,
    HeaderValue,
    HeaderValueLf,
    HeadersLf,

    // ---- Bodies ----
    BodyIdentity,
    BodyEof,

    // ---- Chunked transfer encoding ----
    ChunkSizeStart,
    ChunkSize,
    ChunkExt,
    ChunkSizeLf,
    ChunkData,
    ChunkDataCr,
    ChunkDataLf,

    // ---- Chunked trailers ----
    TrailerStart,
    TrailerField,
    TrailerFieldLf,
    TrailerEndLf,
}

impl State {
    /// States whose bytes count toward the header size limit.
    fn in_header_section(self) -> bool {
        matches!(
            self,
            Self::ResOrReqH
                | Self::Method
                | Self::UrlStart
                | Self::Url
                | Self::Http
                | Self::MajorFirst
                | Self::Major
                | Self::MinorFirst
                | Self::Minor
                | Self::StatusFirst
                | Self::Status
                | Self::StatusText
                | Self::LineLf
                | Self::HeaderStart
                | Self::HeaderField
                | Self::HeaderValueOws
                | Self::HeaderValue
                | Self::HeaderValueLf
                | Self::HeadersLf
        )
    }

    /// The data event a token in this state belongs to.
    fn data_event(self) -> Option<EventKind> {
        match self {
            Self::Url => Some(EventKind::Url),
            Self::HeaderField => Some(EventKind::HeaderField),
            Self::HeaderValue => Some(EventKind::HeaderValue),
            _ => None,
        }
    }
}

/// Which header the current field/value pair belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeaderState {
    #[default]
    General,
    ContentLength,
    TransferEncoding,
    Connection,
    Upgrade,
}

impl HeaderState {
    /// Classify a lowercased header name.
    fn classify(name: &[u8]) -> Self {
        match name {
            b"content-length" => Self::ContentLength,
            b"transfer-encoding" => Self::TransferEncoding,
            b"connection" => Self::Connection,
            b"upgrade" => Self::Upgrade,
            _ => Self::General,
        }
    }
}

/// Longest header name worth remembering (`transfer-encoding`).
const MAX_SPECIAL_NAME: usize = 17;
/// Bytes of a special header value kept for inspection.
const MAX_SPECIAL_VALUE: usize = 1024;

const HTTP: &[u8] = b"HTTP/";

// ---------------------------------------------------------------------------
// Http1Engine
// ---------------------------------------------------------------------------

/// A resumable HTTP/1.x state machine.
///
/// Tokens that callers receive (URL, header names and values, body) are
/// never buffered: they are delivered as fragments of the input slice, one
/// callback per contiguous run, so a value split across `execute` calls
/// arrives in several pieces.
#[derive(Debug, Clone, Default)]
pub struct Http1Engine {
    config: EngineConfig,
}

impl Http1Engine {
    /// Create an engine with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom limits.
    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// The limits in effect.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Engine for Http1Engine {
    fn execute(&self, inst: &mut Instance, settings: &Settings<'_>, data: &[u8]) -> usize {
        if !inst.raw().errno.is_ok() {
            return 0;
        }
        let mut run = Run {
            inst,
            settings,
            config: &self.config,
        };
        if data.is_empty() {
            run.eof()
        } else {
            run.feed(data)
        }
    }
}

/// Outcome of one callback as seen by the state machine.
enum Flow {
    Continue,
    Stop,
    Abort,
}

/// One `execute` call in progress.
struct Run<'r, 'a> {
    inst: &'r mut Instance,
    settings: &'r Settings<'a>,
    config: &'r EngineConfig,
}

impl Run<'_, '_> {
    fn feed(&mut self, data: &[u8]) -> usize {
        // A token cut off by the previous call continues at offset 0.
        let mut mark = self.inst.raw.state.data_event().map(|_| 0);
        let mut i = 0;

        while i < data.len() {
            let state = self.inst.raw.state;

            // ----- Bulk paths for body states -----
            match state {
                State::BodyIdentity | State::ChunkData => {
                    let available = (data.len() - i) as u64;
                    let take = available.min(self.inst.raw.remaining) as usize;
                    let end = i + take;
                    self.inst.raw.remaining -= take as u64;
                    let done = self.inst.raw.remaining == 0;

                    if done && state == State::ChunkData {
                        self.inst.raw.state = State::ChunkDataCr;
                    }
                    // With `take == 0` a stop in the previous call's last
                    // fragment is being resumed; only completion is left.
                    if take > 0 {
                        if let Some(n) = self.emit(EventKind::Body, &data[i..end], i, end) {
                            return n;
                        }
                    }
                    i = end;

                    if done && state == State::BodyIdentity {
                        if let Some(n) = self.complete_message(i.saturating_sub(1), i) {
                            return n;
                        }
                    }
                    continue;
                }
                State::BodyEof => {
                    let end = data.len();
                    if let Some(n) = self.emit(EventKind::Body, &data[i..end], i, end) {
                        return n;
                    }
                    i = end;
                    continue;
                }
                _ => {}
            }

            // ----- Byte-by-byte path -----
            let byte = data[i];
            let next = i + 1;

            if state.in_header_section() {
                self.inst.raw.nread += 1;
                if self.inst.raw.nread > self.config.max_header_size {
                    return self.fail(
                        i,
                        Errno::HeaderOverflow,
                        format!("header section exceeds {} bytes", self.config.max_header_size),
                    );
                }
            }

            match state {
                // ===================== BETWEEN MESSAGES =====================
                State::Dead => {
                    if !matches!(byte, b'\r' | b'\n') {
                        return self.fail(
                            i,
                            Errno::ClosedConnection,
                            format!("unexpected byte 0x{byte:02X} after final message"),
                        );
                    }
                }

                State::Start => {
                    if matches!(byte, b'\r' | b'\n') {
                        i = next;
                        continue;
                    }
                    match self.inst.message_type() {
                        MessageType::Response => {
                            if byte != b'H' {
                                return self.fail(
                                    i,
                                    Errno::InvalidConstant,
                                    format!("expected 'H' starting status line, found 0x{byte:02X}"),
                                );
                            }
                            self.begin_message(true);
                            self.inst.raw.index = 1;
                            self.inst.raw.state = State::Http;
                        }
                        MessageType::Both if byte == b'H' => {
                            self.begin_message(false);
                            self.inst.raw.state = State::ResOrReqH;
                        }
                        MessageType::Request | MessageType::Both => {
                            if !byte.is_ascii_uppercase() {
                                return self.fail(
                                    i,
                                    Errno::InvalidMethod,
                                    format!("unexpected byte 0x{byte:02X} starting request method"),
                                );
                            }
                            self.begin_message(false);
                            self.inst.raw.scratch.push(byte);
                            self.inst.raw.state = State::Method;
                        }
                    }
                    self.inst.raw.nread = 1;
                    if let Some(n) = self.notify(EventKind::MessageBegin, i, next) {
                        return n;
                    }
                }

                State::ResOrReqH => {
                    if byte == b'T' {
                        self.inst.raw.response = true;
                        self.inst.raw.index = 2;
                        self.inst.raw.state = State::Http;
                    } else {
                        self.inst.raw.scratch.push(b'H');
                        self.inst.raw.state = State::Method;
                        if let Some(n) = self.method_byte(byte, i) {
                            return n;
                        }
                    }
                }

                // ===================== START LINE =====================
                State::Method => {
                    if let Some(n) = self.method_byte(byte, i) {
                        return n;
                    }
                }

                State::UrlStart => {
                    if is_url_byte(byte) {
                        mark = Some(i);
                        self.inst.raw.state = State::Url;
                    } else {
                        return self.fail(
                            i,
                            Errno::InvalidUrl,
                            format!("unexpected byte 0x{byte:02X} starting request target"),
                        );
                    }
                }

                State::Url => {
                    if byte == b' ' || byte == b'\r' {
                        if byte == b' ' {
                            self.inst.raw.index = 0;
                            self.inst.raw.state = State::Http;
                        } else {
                            // HTTP/0.9 simple request: no version token.
                            self.inst.raw.http_major = 0;
                            self.inst.raw.http_minor = 9;
                            self.inst.raw.state = State::LineLf;
                        }
                        let start = mark.take().unwrap_or(i);
                        if let Some(n) = self.emit(EventKind::Url, &data[start..i], i, next) {
                            return n;
                        }
                    } else if !is_url_byte(byte) {
                        return self.fail(
                            i,
                            Errno::InvalidUrl,
                            format!("unexpected byte 0x{byte:02X} in request target"),
                        );
                    }
                }

                State::Http => {
                    let index = usize::from(self.inst.raw.index);
                    if HTTP.get(index) != Some(&byte) {
                        return self.fail(
                            i,
                            Errno::InvalidConstant,
                            format!("expected \"HTTP/\", found 0x{byte:02X}"),
                        );
                    }
                    self.inst.raw.index += 1;
                    if usize::from(self.inst.raw.index) == HTTP.len() {
                        self.inst.raw.state = State::MajorFirst;
                    }
                }

                State::MajorFirst => match digit(byte) {
                    Some(d) => {
                        self.inst.raw.http_major = d;
                        self.inst.raw.state = State::Major;
                    }
                    None => return self.bad_version(i, byte),
                },

                State::Major => {
                    if byte == b'.' {
                        self.inst.raw.state = State::MinorFirst;
                    } else {
                        match digit(byte).map(|d| self.inst.raw.http_major * 10 + d) {
                            Some(major) if major <= 999 => self.inst.raw.http_major = major,
                            _ => return self.bad_version(i, byte),
                        }
                    }
                }

                State::MinorFirst => match digit(byte) {
                    Some(d) => {
                        self.inst.raw.http_minor = d;
                        self.inst.raw.state = State::Minor;
                    }
                    None => return self.bad_version(i, byte),
                },

                State::Minor => {
                    if self.inst.raw.response && byte == b' ' {
                        self.inst.raw.state = State::StatusFirst;
                    } else if !self.inst.raw.response && byte == b'\r' {
                        self.inst.raw.state = State::LineLf;
                    } else {
                        match digit(byte).map(|d| self.inst.raw.http_minor * 10 + d) {
                            Some(minor) if minor <= 999 => self.inst.raw.http_minor = minor,
                            _ => return self.bad_version(i, byte),
                        }
                    }
                }

                State::StatusFirst => match digit(byte) {
                    Some(d) => {
                        self.inst.raw.status_code = d;
                        self.inst.raw.index = 1;
                        self.inst.raw.state = State::Status;
                    }
                    None => return self.bad_status(i, byte),
                },

                State::Status => {
                    if let Some(d) = digit(byte) {
                        if self.inst.raw.index >= 3 {
                            return self.bad_status(i, byte);
                        }
                        self.inst.raw.status_code = self.inst.raw.status_code * 10 + d;
                        self.inst.raw.index += 1;
                    } else if self.inst.raw.index != 3 || !matches!(byte, b' ' | b'\r') {
                        return self.bad_status(i, byte);
                    } else if byte == b' ' {
                        self.inst.raw.state = State::StatusText;
                    } else {
                        self.inst.raw.state = State::LineLf;
                        if let Some(n) = self.notify(EventKind::StatusComplete, i, next) {
                            return n;
                        }
                    }
                }

                State::StatusText => {
                    if byte == b'\r' {
                        self.inst.raw.state = State::LineLf;
                        if let Some(n) = self.notify(EventKind::StatusComplete, i, next) {
                            return n;
                        }
                    } else if byte == b'\n' {
                        return self.lf_expected(i, byte);
                    }
                }

                State::LineLf => {
                    if byte != b'\n' {
                        return self.lf_expected(i, byte);
                    }
                    self.inst.raw.state = State::HeaderStart;
                }

                // ===================== HEADERS =====================
                State::HeaderStart => {
                    if byte == b'\r' {
                        self.inst.raw.state = State::HeadersLf;
                    } else if is_tchar(byte) {
                        mark = Some(i);
                        self.inst.raw.scratch.clear();
                        self.remember_name_byte(byte);
                        self.inst.raw.state = State::HeaderField;
                    } else {
                        return self.bad_header(i, byte);
                    }
                }

                State::HeaderField => {
                    if byte == b':' {
                        let header_state = HeaderState::classify(&self.inst.raw.scratch);
                        self.inst.raw.header_state = header_state;
                        self.inst.raw.scratch.clear();
                        self.inst.raw.state = State::HeaderValueOws;
                        let start = mark.take().unwrap_or(i);
                        if let Some(n) = self.emit(EventKind::HeaderField, &data[start..i], i, next)
                        {
                            return n;
                        }
                    } else if is_tchar(byte) {
                        self.remember_name_byte(byte);
                    } else {
                        return self.bad_header(i, byte);
                    }
                }

                State::HeaderValueOws => {
                    if byte == b' ' || byte == b'\t' {
                        // Skip optional whitespace before the value.
                    } else if byte == b'\r' {
                        self.inst.raw.state = State::HeaderValueLf;
                        if let Some(n) = self.finish_header_value(i) {
                            return n;
                        }
                    } else if is_field_content_byte(byte) {
                        mark = Some(i);
                        self.remember_value_byte(byte);
                        self.inst.raw.state = State::HeaderValue;
                    } else {
                        return self.bad_header(i, byte);
                    }
                }

                State::HeaderValue => {
                    if byte == b'\r' {
                        self.inst.raw.state = State::HeaderValueLf;
                        let start = mark.take().unwrap_or(i);
                        // Flags must be in place before a handler can stop.
                        if let Some(n) = self.finish_header_value(i) {
                            return n;
                        }
                        if let Some(n) = self.emit(EventKind::HeaderValue, &data[start..i], i, next)
                        {
                            return n;
                        }
                    } else if is_field_content_byte(byte) {
                        self.remember_value_byte(byte);
                    } else {
                        return self.bad_header(i, byte);
                    }
                }

                State::HeaderValueLf => {
                    if byte != b'\n' {
                        return self.lf_expected(i, byte);
                    }
                    self.inst.raw.state = State::HeaderStart;
                }

                State::HeadersLf => {
                    if byte != b'\n' {
                        return self.lf_expected(i, byte);
                    }
                    if let Some(n) = self.headers_complete(i, next) {
                        return n;
                    }
                }

                // ===================== CHUNKED ENCODING =====================
                State::ChunkSizeStart => match hex(byte) {
                    Some(v) => {
                        self.inst.raw.remaining = v;
                        self.inst.raw.state = State::ChunkSize;
                    }
                    None => return self.bad_chunk(i, byte),
                },

                State::ChunkSize => {
                    if let Some(v) = hex(byte) {
                        match self.inst.raw.remaining.checked_mul(16) {
                            Some(size) => self.inst.raw.remaining = size + v,
                            None => {
                                return self.fail(
                                    i,
                                    Errno::InvalidChunkSize,
                                    "chunk size overflows 64 bits",
                                );
                            }
                        }
                    } else if byte == b';' || byte == b' ' || byte == b'\t' {
                        // RFC 9112 §7.1.1: ignore chunk extensions.
                        self.inst.raw.state = State::ChunkExt;
                    } else if byte == b'\r' {
                        self.inst.raw.state = State::ChunkSizeLf;
                    } else {
                        return self.bad_chunk(i, byte);
                    }
                }

                State::ChunkExt => {
                    if byte == b'\r' {
                        self.inst.raw.state = State::ChunkSizeLf;
                    }
                }

                State::ChunkSizeLf => {
                    if byte != b'\n' {
                        return self.lf_expected(i, byte);
                    }
                    if self.inst.raw.remaining == 0 {
                        // Last chunk: enter the trailer section.
                        self.inst.raw.type_flags |= flags::TRAILING;
                        self.inst.raw.state = State::TrailerStart;
                    } else {
                        self.inst.raw.state = State::ChunkData;
                    }
                }

                State::ChunkDataCr => {
                    if byte != b'\r' {
                        return self.fail(
                            i,
                            Errno::InvalidChunkSize,
                            format!("expected CR after chunk data, found 0x{byte:02X}"),
                        );
                    }
                    self.inst.raw.state = State::ChunkDataLf;
                }

                State::ChunkDataLf => {
                    if byte != b'\n' {
                        return self.lf_expected(i, byte);
                    }
                    self.inst.raw.state = State::ChunkSizeStart;
                }

                // ===================== TRAILER SECTION =====================
                State::TrailerStart => {
                    self.inst.raw.state = if byte == b'\r' {
                        State::TrailerEndLf
                    } else {
                        State::TrailerField
                    };
                }

                State::TrailerField => {
                    if byte == b'\r' {
                        self.inst.raw.state = State::TrailerFieldLf;
                    }
                }

                State::TrailerFieldLf => {
                    if byte != b'\n' {
                        return self.lf_expected(i, byte);
                    }
                    self.inst.raw.state = State::TrailerStart;
                }

                State::TrailerEndLf => {
                    if byte != b'\n' {
                        return self.lf_expected(i, byte);
                    }
                    if let Some(n) = self.complete_message(i, next) {
                        return n;
                    }
                }

                // Handled by the bulk paths above.
                State::BodyIdentity | State::BodyEof | State::ChunkData => {
                    return self.fail(
                        i,
                        Errno::InvalidInternalState,
                        format!("body state {state:?} reached byte path"),
                    );
                }
            }

            i = next;
        }

        // Deliver the unfinished token; the next call picks it up at 0.
        if let (Some(start), Some(event)) = (mark, self.inst.raw.state.data_event()) {
            if start < data.len() {
                if let Some(n) = self.emit(event, &data[start..], start, data.len()) {
                    return n;
                }
            }
        }

        data.len()
    }

    /// End of stream.
    fn eof(&mut self) -> usize {
        match self.inst.raw.state {
            // A stop from the last body fragment left completion pending.
            State::BodyIdentity if self.inst.raw.remaining == 0 => {
                self.complete_message(0, 0);
                0
            }
            State::BodyEof => {
                self.complete_message(0, 0);
                0
            }
            State::Start | State::Dead => 0,
            state => self.fail(
                0,
                Errno::InvalidEofState,
                format!("stream ended in state {state:?}"),
            ),
        }
    }

    // ----- message lifecycle ----------------------------------------------

    /// Clear per-message progress. The type bits are kept.
    fn begin_message(&mut self, response: bool) {
        let raw = &mut self.inst.raw;
        raw.type_flags &= MessageType::MASK;
        raw.response = response;
        raw.header_state = HeaderState::General;
        raw.index = 0;
        raw.nread = 0;
        raw.content_length = None;
        raw.remaining = 0;
        raw.scratch.clear();
        raw.http_method = None;
        raw.http_major = 0;
        raw.http_minor = 0;
        raw.status_code = 0;
        raw.upgrade = false;
    }

    fn headers_complete(&mut self, i: usize, next: usize) -> Option<usize> {
        let raw = &mut self.inst.raw;
        raw.nread = 0;
        raw.upgrade = if raw.response {
            raw.type_flags & flags::UPGRADE != 0 && raw.status_code == 101
        } else {
            raw.type_flags & flags::UPGRADE != 0 || raw.http_method == Some(HttpMethod::CONNECT)
        };
        // Provisional; the body decision below overrides it.
        raw.state = State::Start;

        match self.signal(EventKind::HeadersComplete) {
            Flow::Continue => {}
            Flow::Stop => self.inst.raw.type_flags |= flags::SKIPBODY,
            Flow::Abort => return Some(self.abort(EventKind::HeadersComplete, i)),
        }

        if self.inst.raw.upgrade {
            // The rest of the stream belongs to another protocol.
            return Some(self.complete_message(i, next).unwrap_or(next));
        }

        let session_flags = self.inst.raw.type_flags;
        if session_flags & flags::SKIPBODY != 0 {
            return self.complete_message(i, next);
        }
        if session_flags & flags::CHUNKED != 0 {
            self.inst.raw.state = State::ChunkSizeStart;
            return None;
        }

        let content_length = self.inst.raw.content_length;
        match content_length {
            Some(0) => self.complete_message(i, next),
            Some(length) => {
                self.inst.raw.remaining = length;
                self.inst.raw.state = State::BodyIdentity;
                None
            }
            None if self.inst.needs_eof() => {
                self.inst.raw.state = State::BodyEof;
                None
            }
            None => self.complete_message(i, next),
        }
    }

    fn complete_message(&mut self, i: usize, next: usize) -> Option<usize> {
        self.inst.raw.state = if self.inst.should_keep_alive() {
            State::Start
        } else {
            State::Dead
        };
        tracing::trace!(keep_alive = self.inst.raw.state == State::Start, "message complete");
        self.notify(EventKind::MessageComplete, i, next)
    }

    // ----- token helpers --------------------------------------------------

    fn method_byte(&mut self, byte: u8, i: usize) -> Option<usize> {
        if byte == b' ' {
            let method = HttpMethod::from_bytes(&self.inst.raw.scratch);
            return match method {
                Some(method) => {
                    self.inst.raw.http_method = Some(method);
                    self.inst.raw.scratch.clear();
                    self.inst.raw.state = State::UrlStart;
                    None
                }
                None => {
                    let token = String::from_utf8_lossy(&self.inst.raw.scratch).into_owned();
                    Some(self.fail(i, Errno::InvalidMethod, token))
                }
            };
        }

        if byte.is_ascii_uppercase() || byte == b'-' {
            self.inst.raw.scratch.push(byte);
            if HttpMethod::is_prefix(&self.inst.raw.scratch) {
                return None;
            }
            let token = String::from_utf8_lossy(&self.inst.raw.scratch).into_owned();
            return Some(self.fail(i, Errno::InvalidMethod, token));
        }

        Some(self.fail(
            i,
            Errno::InvalidMethod,
            format!("unexpected byte 0x{byte:02X} in request method"),
        ))
    }

    fn remember_name_byte(&mut self, byte: u8) {
        let scratch = &mut self.inst.raw.scratch;
        if scratch.len() <= MAX_SPECIAL_NAME {
            scratch.push(byte.to_ascii_lowercase());
        }
    }

    fn remember_value_byte(&mut self, byte: u8) {
        let raw = &mut self.inst.raw;
        if raw.header_state != HeaderState::General && raw.scratch.len() < MAX_SPECIAL_VALUE {
            raw.scratch.push(byte);
        }
    }

    /// Apply the value of a special header to the session flags.
    fn finish_header_value(&mut self, i: usize) -> Option<usize> {
        let raw = &mut self.inst.raw;
        let value = std::mem::take(&mut raw.scratch);
        let header_state = std::mem::take(&mut raw.header_state);
        let text = String::from_utf8_lossy(&value);

        match header_state {
            HeaderState::General => {}
            HeaderState::ContentLength => {
                let trimmed = text.trim();
                let parsed = if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit())
                {
                    trimmed.parse::<u64>().ok()
                } else {
                    None
                };
                match parsed {
                    Some(length)
                        if length <= self.config.max_content_length
                            && raw.content_length.is_none_or(|prev| prev == length) =>
                    {
                        raw.content_length = Some(length);
                    }
                    _ => {
                        return Some(self.fail(
                            i,
                            Errno::InvalidContentLength,
                            trimmed.to_string(),
                        ));
                    }
                }
            }
            HeaderState::TransferEncoding => {
                let last = text.rsplit(',').next().unwrap_or("").trim();
                if last.eq_ignore_ascii_case("chunked") {
                    raw.type_flags |= flags::CHUNKED;
                }
            }
            HeaderState::Connection => {
                for token in text.split(',').map(str::trim) {
                    if token.eq_ignore_ascii_case("keep-alive") {
                        raw.type_flags |= flags::CONNECTION_KEEP_ALIVE;
                    } else if token.eq_ignore_ascii_case("close") {
                        raw.type_flags |= flags::CONNECTION_CLOSE;
                    }
                }
            }
            HeaderState::Upgrade => raw.type_flags |= flags::UPGRADE,
        }
        None
    }

    // ----- callbacks ------------------------------------------------------

    fn signal(&mut self, event: EventKind) -> Flow {
        flow(self.settings.signal(event, self.inst))
    }

    /// Fire a signal event. `Some(n)` means `execute` must return `n`.
    fn notify(&mut self, event: EventKind, i: usize, next: usize) -> Option<usize> {
        match self.signal(event) {
            Flow::Continue => None,
            Flow::Stop => Some(next),
            Flow::Abort => Some(self.abort(event, i)),
        }
    }

    /// Fire a data event. `Some(n)` means `execute` must return `n`.
    fn emit(&mut self, event: EventKind, bytes: &[u8], i: usize, next: usize) -> Option<usize> {
        if bytes.is_empty() {
            return None;
        }
        match flow(self.settings.data(event, self.inst, bytes)) {
            Flow::Continue => None,
            Flow::Stop => Some(next),
            Flow::Abort => Some(self.abort(event, i)),
        }
    }

    fn abort(&mut self, event: EventKind, i: usize) -> usize {
        self.inst.raw.errno = Errno::callback(event);
        i
    }

    // ----- errors ---------------------------------------------------------

    fn fail(&mut self, i: usize, errno: Errno, detail: impl Into<String>) -> usize {
        let detail = detail.into();
        tracing::debug!(?errno, offset = i, detail = detail.as_str(), "grammar error");
        self.inst.raw.errno = errno;
        self.inst.raw.error_detail = Some(detail);
        i
    }

    fn bad_version(&mut self, i: usize, byte: u8) -> usize {
        self.fail(
            i,
            Errno::InvalidVersion,
            format!("unexpected byte 0x{byte:02X} in HTTP version"),
        )
    }

    fn bad_status(&mut self, i: usize, byte: u8) -> usize {
        self.fail(
            i,
            Errno::InvalidStatus,
            format!("unexpected byte 0x{byte:02X} in status code"),
        )
    }

    fn bad_header(&mut self, i: usize, byte: u8) -> usize {
        self.fail(
            i,
            Errno::InvalidHeaderToken,
            format!("unexpected byte 0x{byte:02X} in header"),
        )
    }

    fn bad_chunk(&mut self, i: usize, byte: u8) -> usize {
        self.fail(
            i,
            Errno::InvalidChunkSize,
            format!("unexpected byte 0x{byte:02X} in chunk size"),
        )
    }

    fn lf_expected(&mut self, i: usize, byte: u8) -> usize {
        self.fail(
            i,
            Errno::LfExpected,
            format!("expected LF, found 0x{byte:02X}"),
        )
    }
}

fn flow(code: i32) -> Flow {
    match code {
        STOP => Flow::Stop,
        ABORT => Flow::Abort,
        _ => Flow::Continue,
    }
}

// ---------------------------------------------------------------------------
// Character classification helpers (RFC 9110 / RFC 9112)
// ---------------------------------------------------------------------------

#[inline]
fn digit(b: u8) -> Option<u16> {
    b.is_ascii_digit().then(|| u16::from(b - b'0'))
}

#[inline]
fn hex(b: u8) -> Option<u64> {
    (b as char).to_digit(16).map(u64::from)
}

/// Bytes allowed in a request target: visible ASCII and obs-text.
#[inline]
fn is_url_byte(b: u8) -> bool {
    b > b' ' && b != 0x7F
}

/// `tchar` – characters allowed in HTTP tokens (method, header names).
///
/// ```text
/// tchar = "!" / "#" / "$" / "%" / "&" / "'" / "*" / "+" / "-" / "." /
///         "^" / "_" / "`" / "|" / "~" / DIGIT / ALPHA
/// ```
#[inline]
fn is_tchar(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'\''
            | b'*'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~'
            | b'0'..=b'9'
            | b'a'..=b'z'
            | b'A'..=b'Z'
    )
}

/// Bytes permitted inside a header field value:
/// `SP / HTAB / VCHAR / obs-text`.
#[inline]
fn is_field_content_byte(b: u8) -> bool {
    b == b' ' || b == b'\t' || (0x21..=0x7E).contains(&b) || b >= 0x80
}

// ---------------------------------------------------------------------------
// Tests (unit)
// ---------------------------------------------------------------------------
