use serde::{Deserialize, Serialize};

use crate::callback::{Halt, Outcome};
use crate::engine::{HeaderState, State};
use crate::error::{Errno, Error};
use crate::types::{HttpMethod, MessageType};

/// Engine flag bits stored above the two type bits of `type_flags`.
pub mod flags {
    pub const CHUNKED: u8 = 1 << 2;
    pub const CONNECTION_KEEP_ALIVE: u8 = 1 << 3;
    pub const CONNECTION_CLOSE: u8 = 1 << 4;
    pub const TRAILING: u8 = 1 << 5;
    pub const UPGRADE: u8 = 1 << 6;
    pub const SKIPBODY: u8 = 1 << 7;
}

// ---------------------------------------------------------------------------
// RawInstance
// ---------------------------------------------------------------------------

/// The session record an engine reads and writes while parsing.
///
/// Everything except `type_flags`'s low two bits is engine progress. Calling
/// code should treat it as opaque; it is public so that a session can be
/// saved and adopted again with [`Instance::from_raw`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInstance {
    /// Message type in bits 0-1, engine flags (see [`flags`]) above.
    pub type_flags: u8,
    pub state: State,
    pub header_state: HeaderState,
    /// Position inside a fixed token or digit run.
    pub index: u8,
    /// Bytes seen in the current start line and header section.
    pub nread: u32,
    pub content_length: Option<u64>,
    /// Body or chunk bytes still expected.
    pub remaining: u64,
    /// Small tokens the engine must inspect (method, special headers).
    pub scratch: Vec<u8>,
    /// The current message was recognized as a response.
    pub response: bool,
    pub http_method: Option<HttpMethod>,
    pub http_major: u16,
    pub http_minor: u16,
    pub status_code: u16,
    pub upgrade: bool,
    pub errno: Errno,
    pub error_detail: Option<String>,
}

impl RawInstance {
    /// A fresh record for a session of type `ty`.
    pub fn new(ty: MessageType) -> Self {
        Self {
            type_flags: ty.bits(),
            state: State::Start,
            header_state: HeaderState::General,
            index: 0,
            nread: 0,
            content_length: None,
            remaining: 0,
            scratch: Vec::new(),
            response: ty == MessageType::Response,
            http_method: None,
            http_major: 0,
            http_minor: 0,
            status_code: 0,
            upgrade: false,
            errno: Errno::Ok,
            error_detail: None,
        }
    }
}

impl Default for RawInstance {
    fn default() -> Self {
        Self::new(MessageType::default())
    }
}

// ---------------------------------------------------------------------------
// Instance
// ---------------------------------------------------------------------------

/// One parse session: progress, message metadata and error state.
///
/// An instance is independent of any [`Parser`](crate::Parser); the same
/// parser can drive many instances, and an instance can be handed to a
/// different parser between calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub(crate) raw: RawInstance,
    error: Option<Error>,
}

impl Instance {
    /// A new session of type [`MessageType::Both`].
    pub fn new() -> Self {
        Self::with_type(MessageType::default())
    }

    /// A new session of the given type.
    pub fn with_type(ty: MessageType) -> Self {
        Self {
            raw: RawInstance::new(ty),
            error: None,
        }
    }

    /// Create a session and hand it to `configure` before returning it.
    ///
    /// ```rust
    /// use hookwire::{Instance, MessageType};
    ///
    /// let inst = Instance::build(|inst| inst.set_message_type(MessageType::Request));
    /// assert_eq!(inst.message_type(), MessageType::Request);
    /// ```
    pub fn build<F>(configure: F) -> Self
    where
        F: FnOnce(&mut Instance),
    {
        let mut inst = Self::new();
        configure(&mut inst);
        inst
    }

    /// Adopt an existing session record without re-initialising it.
    ///
    /// Parsing continues exactly where the record left off. An error code
    /// already present in the record is classified into [`Instance::error`].
    pub fn from_raw(raw: RawInstance) -> Self {
        let error = Error::from_errno(raw.errno).map(|error| match &raw.error_detail {
            Some(detail) => error.with_detail(detail.clone()),
            None => error,
        });
        Self { raw, error }
    }

    /// Give up the session record, e.g. to persist it.
    pub fn into_raw(self) -> RawInstance {
        self.raw
    }

    /// The session record.
    pub fn raw(&self) -> &RawInstance {
        &self.raw
    }

    /// Mutable access to the session record. Only the type bits are meant
    /// to be changed from outside an engine.
    pub fn raw_mut(&mut self) -> &mut RawInstance {
        &mut self.raw
    }

    // ----- type / flags ---------------------------------------------------

    /// The configured type, decoded from the low two bits.
    pub fn message_type(&self) -> MessageType {
        MessageType::from_bits(self.raw.type_flags)
    }

    /// Change the message type. The engine flag bits are left untouched.
    pub fn set_message_type(&mut self, ty: MessageType) {
        self.raw.type_flags = (self.raw.type_flags & !MessageType::MASK) | ty.bits();
    }

    /// Type bits and engine flags as one byte.
    pub fn type_flags(&self) -> u8 {
        self.raw.type_flags
    }

    // ----- message fields -------------------------------------------------

    /// Method of the current request, once its token has been read.
    pub fn http_method(&self) -> Option<HttpMethod> {
        self.raw.http_method
    }

    /// Major version of the current message.
    pub fn http_major(&self) -> u16 {
        self.raw.http_major
    }

    /// Minor version of the current message.
    pub fn http_minor(&self) -> u16 {
        self.raw.http_minor
    }

    /// `major.minor`, e.g. `"1.1"`.
    pub fn http_version(&self) -> String {
        format!("{}.{}", self.raw.http_major, self.raw.http_minor)
    }

    /// Status code of the current response; `0` for requests.
    pub fn http_status(&self) -> u16 {
        self.raw.status_code
    }

    /// The message asked to switch protocols (`Upgrade` header or
    /// `CONNECT`).
    pub fn is_upgrade(&self) -> bool {
        self.raw.upgrade
    }

    /// The current message's body ends only when the connection closes.
    pub fn needs_eof(&self) -> bool {
        if !self.raw.response {
            return false;
        }
        let status = self.raw.status_code;
        if status / 100 == 1 || status == 204 || status == 304 {
            return false;
        }
        if self.raw.type_flags & flags::SKIPBODY != 0 {
            return false;
        }
        self.raw.type_flags & flags::CHUNKED == 0 && self.raw.content_length.is_none()
    }

    /// Whether another message may follow on the same connection.
    pub fn should_keep_alive(&self) -> bool {
        let session_flags = self.raw.type_flags;
        let persistent = if self.raw.http_major > 0 && self.raw.http_minor > 0 {
            session_flags & flags::CONNECTION_CLOSE == 0
        } else {
            session_flags & flags::CONNECTION_KEEP_ALIVE != 0
        };
        persistent && !self.needs_eof()
    }

    // ----- error slot -----------------------------------------------------

    /// The first error recorded since the last reset.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Whether an error has been recorded.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Fill the error slot unless it already holds an error.
    pub(crate) fn record_error(&mut self, error: Error) {
        match &self.error {
            None => self.error = Some(error),
            Some(existing) => {
                tracing::debug!(%existing, ignored = %error, "error slot already set");
            }
        }
    }

    // ----- handler control ------------------------------------------------

    /// Stop parsing without an error.
    ///
    /// From `headers_complete` this tells the engine the message has no
    /// body; from any other event the current `parse` call returns early.
    pub fn stop(&self) -> Outcome {
        Err(Halt::Stop)
    }

    /// Abort parsing with a [`Callback`](crate::ErrorKind::Callback) error.
    pub fn abort(&self) -> Outcome {
        Err(Halt::Abort(None))
    }

    /// Abort parsing, recording `error` instead of the generic callback
    /// error.
    pub fn abort_with(&self, error: Error) -> Outcome {
        Err(Halt::Abort(Some(error)))
    }

    // ----- lifecycle ------------------------------------------------------

    /// Return to the not-started state. The message type is kept; all
    /// progress, metadata and the error slot are cleared.
    pub fn reset(&mut self) {
        self.raw = RawInstance::new(self.message_type());
        self.error = None;
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}
