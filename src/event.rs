use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

/// Whether an event carries a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// No payload: the handler only receives the instance.
    Signal,
    /// A byte fragment accompanies the event.
    Data,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal => f.write_str("signal"),
            Self::Data => f.write_str("data"),
        }
    }
}

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// The closed set of events the engine dispatches while parsing.
///
/// The discriminant doubles as the slot index in [`Settings`](crate::Settings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MessageBegin = 0,
    Url,
    StatusComplete,
    HeaderField,
    HeaderValue,
    HeadersComplete,
    Body,
    MessageComplete,
}

impl EventKind {
    /// Number of event kinds.
    pub const COUNT: usize = 8;

    /// Every kind, in settings-table order.
    pub const ALL: [EventKind; Self::COUNT] = [
        Self::MessageBegin,
        Self::Url,
        Self::StatusComplete,
        Self::HeaderField,
        Self::HeaderValue,
        Self::HeadersComplete,
        Self::Body,
        Self::MessageComplete,
    ];

    /// Slot index of this kind.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Signal or data.
    pub fn shape(self) -> Shape {
        match self {
            Self::Url | Self::HeaderField | Self::HeaderValue | Self::Body => Shape::Data,
            Self::MessageBegin
            | Self::StatusComplete
            | Self::HeadersComplete
            | Self::MessageComplete => Shape::Signal,
        }
    }

    /// Snake-case name, e.g. `"headers_complete"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MessageBegin => "message_begin",
            Self::Url => "url",
            Self::StatusComplete => "status_complete",
            Self::HeaderField => "header_field",
            Self::HeaderValue => "header_value",
            Self::HeadersComplete => "headers_complete",
            Self::Body => "body",
            Self::MessageComplete => "message_complete",
        }
    }

    /// Name of the registration method for this kind (`on_url`, ...).
    pub fn callback_name(self) -> &'static str {
        match self {
            Self::MessageBegin => "on_message_begin",
            Self::Url => "on_url",
            Self::StatusComplete => "on_status_complete",
            Self::HeaderField => "on_header_field",
            Self::HeaderValue => "on_header_value",
            Self::HeadersComplete => "on_headers_complete",
            Self::Body => "on_body",
            Self::MessageComplete => "on_message_complete",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
