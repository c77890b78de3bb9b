use serde::{Deserialize, Serialize};
use std::fmt;

use crate::event::EventKind;

// ---------------------------------------------------------------------------
// Errno
// ---------------------------------------------------------------------------

/// Error code as reported by the engine on the session record.
///
/// Callback failures carry the event that failed; everything else names the
/// grammar rule that was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Errno {
    #[default]
    Ok,
    CbMessageBegin,
    CbUrl,
    CbStatusComplete,
    CbHeaderField,
    CbHeaderValue,
    CbHeadersComplete,
    CbBody,
    CbMessageComplete,
    InvalidEofState,
    HeaderOverflow,
    ClosedConnection,
    InvalidVersion,
    InvalidStatus,
    InvalidMethod,
    InvalidUrl,
    LfExpected,
    InvalidHeaderToken,
    InvalidContentLength,
    InvalidChunkSize,
    InvalidConstant,
    InvalidInternalState,
}

impl Errno {
    /// The code an engine reports when the handler for `event` aborts.
    pub fn callback(event: EventKind) -> Self {
        match event {
            EventKind::MessageBegin => Self::CbMessageBegin,
            EventKind::Url => Self::CbUrl,
            EventKind::StatusComplete => Self::CbStatusComplete,
            EventKind::HeaderField => Self::CbHeaderField,
            EventKind::HeaderValue => Self::CbHeaderValue,
            EventKind::HeadersComplete => Self::CbHeadersComplete,
            EventKind::Body => Self::CbBody,
            EventKind::MessageComplete => Self::CbMessageComplete,
        }
    }

    /// `true` for [`Errno::Ok`].
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// The event whose handler failed, for `Cb*` codes.
    pub fn event(self) -> Option<EventKind> {
        match self {
            Self::CbMessageBegin => Some(EventKind::MessageBegin),
            Self::CbUrl => Some(EventKind::Url),
            Self::CbStatusComplete => Some(EventKind::StatusComplete),
            Self::CbHeaderField => Some(EventKind::HeaderField),
            Self::CbHeaderValue => Some(EventKind::HeaderValue),
            Self::CbHeadersComplete => Some(EventKind::HeadersComplete),
            Self::CbBody => Some(EventKind::Body),
            Self::CbMessageComplete => Some(EventKind::MessageComplete),
            _ => None,
        }
    }

    /// Classify the code. `Ok` has no kind.
    pub fn kind(self) -> Option<ErrorKind> {
        let kind = match self {
            Self::Ok => return None,
            Self::CbMessageBegin
            | Self::CbUrl
            | Self::CbStatusComplete
            | Self::CbHeaderField
            | Self::CbHeaderValue
            | Self::CbHeadersComplete
            | Self::CbBody
            | Self::CbMessageComplete => ErrorKind::Callback,
            Self::InvalidEofState => ErrorKind::InvalidEofState,
            Self::HeaderOverflow => ErrorKind::HeaderOverflow,
            Self::ClosedConnection => ErrorKind::ClosedConnection,
            Self::InvalidVersion => ErrorKind::InvalidVersion,
            Self::InvalidStatus => ErrorKind::InvalidStatus,
            Self::InvalidMethod => ErrorKind::InvalidMethod,
            Self::InvalidUrl => ErrorKind::InvalidUrl,
            Self::LfExpected => ErrorKind::LfExpected,
            Self::InvalidHeaderToken => ErrorKind::InvalidHeaderToken,
            Self::InvalidContentLength => ErrorKind::InvalidContentLength,
            Self::InvalidChunkSize => ErrorKind::InvalidChunkSize,
            Self::InvalidConstant => ErrorKind::InvalidConstant,
            Self::InvalidInternalState => ErrorKind::InvalidInternalState,
        };
        Some(kind)
    }
}

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Closed taxonomy of parse failures visible to calling code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// A registered handler aborted the parse.
    Callback,
    /// The stream ended in the middle of a message.
    InvalidEofState,
    /// The header section exceeded the configured size.
    HeaderOverflow,
    /// Data arrived after a message that closes the connection.
    ClosedConnection,
    /// Malformed or unsupported HTTP version token.
    InvalidVersion,
    /// Malformed status code.
    InvalidStatus,
    /// Unrecognized request method token.
    InvalidMethod,
    /// Empty request target or a forbidden byte inside it.
    InvalidUrl,
    /// CR was not followed by LF.
    LfExpected,
    /// Forbidden byte in a header name or value.
    InvalidHeaderToken,
    /// `Content-Length` is not a number, too large, or conflicting.
    InvalidContentLength,
    /// Chunk size is not hexadecimal or overflows.
    InvalidChunkSize,
    /// A fixed string (`HTTP/`) did not match.
    InvalidConstant,
    /// The session record holds a state the engine cannot continue from.
    InvalidInternalState,
}

impl ErrorKind {
    /// Upper-snake name, e.g. `INVALID_METHOD`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Callback => "CALLBACK",
            Self::InvalidEofState => "INVALID_EOF_STATE",
            Self::HeaderOverflow => "HEADER_OVERFLOW",
            Self::ClosedConnection => "CLOSED_CONNECTION",
            Self::InvalidVersion => "INVALID_VERSION",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::InvalidMethod => "INVALID_METHOD",
            Self::InvalidUrl => "INVALID_URL",
            Self::LfExpected => "LF_EXPECTED",
            Self::InvalidHeaderToken => "INVALID_HEADER_TOKEN",
            Self::InvalidContentLength => "INVALID_CONTENT_LENGTH",
            Self::InvalidChunkSize => "INVALID_CHUNK_SIZE",
            Self::InvalidConstant => "INVALID_CONSTANT",
            Self::InvalidInternalState => "INVALID_INTERNAL_STATE",
        }
    }

    /// Human-readable message.
    pub fn description(self) -> &'static str {
        match self {
            Self::Callback => "a callback aborted the parse",
            Self::InvalidEofState => "stream ended at an unexpected time",
            Self::HeaderOverflow => "too many header bytes seen",
            Self::ClosedConnection => "data received after completed connection: close message",
            Self::InvalidVersion => "invalid HTTP version",
            Self::InvalidStatus => "invalid HTTP status code",
            Self::InvalidMethod => "invalid HTTP method",
            Self::InvalidUrl => "invalid URL",
            Self::LfExpected => "LF character expected",
            Self::InvalidHeaderToken => "invalid character in header",
            Self::InvalidContentLength => "invalid content-length header",
            Self::InvalidChunkSize => "invalid character in chunk size",
            Self::InvalidConstant => "invalid constant string",
            Self::InvalidInternalState => "encountered unexpected internal state",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// A classified failure recorded on an [`Instance`](crate::Instance).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Error {
    kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event: Option<EventKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl Error {
    /// An error of `kind` with no event or detail.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            event: None,
            detail: None,
        }
    }

    /// A `Callback` error attributed to the handler of `event`.
    pub fn callback(event: EventKind) -> Self {
        Self::new(ErrorKind::Callback).with_event(event)
    }

    /// Classify an engine code, or `None` for [`Errno::Ok`].
    pub fn from_errno(errno: Errno) -> Option<Self> {
        let kind = errno.kind()?;
        let mut error = Self::new(kind);
        error.event = errno.event();
        Some(error)
    }

    /// Attribute the error to the handler of `event`.
    pub fn with_event(mut self, event: EventKind) -> Self {
        self.event = Some(event);
        self
    }

    /// Attach a detail message.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// The taxonomy entry.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The event whose handler failed, when known.
    pub fn event(&self) -> Option<EventKind> {
        self.event
    }

    /// Engine- or handler-specific detail (offending token, panic message).
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// A handler, not the grammar, ended the parse.
    pub fn is_callback(&self) -> bool {
        self.kind == ErrorKind::Callback
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind.description(), self.kind.name())?;
        if let Some(event) = self.event {
            write!(f, " in {}", event.callback_name())?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_callback_code_classifies_as_callback() {
        for event in EventKind::ALL {
            let errno = Errno::callback(event);
            assert_eq!(errno.kind(), Some(ErrorKind::Callback));
            assert_eq!(errno.event(), Some(event));
        }
    }

    #[test]
    fn ok_has_no_error() {
        assert!(Errno::Ok.is_ok());
        assert_eq!(Error::from_errno(Errno::Ok), None);
    }

    #[test]
    fn grammar_codes_map_one_to_one() {
        let error = Error::from_errno(Errno::InvalidMethod).unwrap();
        assert_eq!(error.kind(), ErrorKind::InvalidMethod);
        assert_eq!(error.event(), None);
        assert_eq!(ErrorKind::InvalidVersion.name(), "INVALID_VERSION");
    }

    #[test]
    fn display_includes_event_and_detail() {
        let error = Error::callback(EventKind::Url).with_detail("unhandled");
        assert_eq!(
            error.to_string(),
            "a callback aborted the parse (CALLBACK) in on_url: unhandled"
        );
    }
}
