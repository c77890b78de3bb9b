use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// HttpMethod
// ---------------------------------------------------------------------------

/// Request methods recognized by the engine.
///
/// Covers RFC 9110 plus the WebDAV, Subversion, UPnP and cache-purge
/// extensions commonly seen on the wire.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    DELETE,
    GET,
    HEAD,
    POST,
    PUT,
    CONNECT,
    OPTIONS,
    TRACE,
    COPY,
    LOCK,
    MKCOL,
    MOVE,
    PROPFIND,
    PROPPATCH,
    SEARCH,
    UNLOCK,
    REPORT,
    MKACTIVITY,
    CHECKOUT,
    MERGE,
    #[serde(rename = "M-SEARCH")]
    MSEARCH,
    NOTIFY,
    SUBSCRIBE,
    UNSUBSCRIBE,
    PATCH,
    PURGE,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 26] = [
        Self::DELETE,
        Self::GET,
        Self::HEAD,
        Self::POST,
        Self::PUT,
        Self::CONNECT,
        Self::OPTIONS,
        Self::TRACE,
        Self::COPY,
        Self::LOCK,
        Self::MKCOL,
        Self::MOVE,
        Self::PROPFIND,
        Self::PROPPATCH,
        Self::SEARCH,
        Self::UNLOCK,
        Self::REPORT,
        Self::MKACTIVITY,
        Self::CHECKOUT,
        Self::MERGE,
        Self::MSEARCH,
        Self::NOTIFY,
        Self::SUBSCRIBE,
        Self::UNSUBSCRIBE,
        Self::PATCH,
        Self::PURGE,
    ];

    /// Length of the longest method token.
    pub const MAX_LEN: usize = 11;

    /// Look up an exact method token.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().as_bytes() == bytes)
    }

    /// `true` if some method token starts with `prefix`.
    pub fn is_prefix(prefix: &[u8]) -> bool {
        Self::ALL
            .iter()
            .any(|m| m.as_str().as_bytes().starts_with(prefix))
    }

    /// Return the method as a static string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DELETE => "DELETE",
            Self::GET => "GET",
            Self::HEAD => "HEAD",
            Self::POST => "POST",
            Self::PUT => "PUT",
            Self::CONNECT => "CONNECT",
            Self::OPTIONS => "OPTIONS",
            Self::TRACE => "TRACE",
            Self::COPY => "COPY",
            Self::LOCK => "LOCK",
            Self::MKCOL => "MKCOL",
            Self::MOVE => "MOVE",
            Self::PROPFIND => "PROPFIND",
            Self::PROPPATCH => "PROPPATCH",
            Self::SEARCH => "SEARCH",
            Self::UNLOCK => "UNLOCK",
            Self::REPORT => "REPORT",
            Self::MKACTIVITY => "MKACTIVITY",
            Self::CHECKOUT => "CHECKOUT",
            Self::MERGE => "MERGE",
            Self::MSEARCH => "M-SEARCH",
            Self::NOTIFY => "NOTIFY",
            Self::SUBSCRIBE => "SUBSCRIBE",
            Self::UNSUBSCRIBE => "UNSUBSCRIBE",
            Self::PATCH => "PATCH",
            Self::PURGE => "PURGE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MessageType
// ---------------------------------------------------------------------------

/// Which grammar the engine assumes for a session.
///
/// Stored in the low two bits of the session's type-flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Request = 0,
    Response = 1,
    /// Decide per message from its first bytes.
    #[default]
    Both = 2,
}

impl MessageType {
    /// Mask selecting the type bits of the flags byte.
    pub const MASK: u8 = 0b11;

    /// Decode the low two bits. The unused pattern `3` reads as `Both`.
    pub fn from_bits(bits: u8) -> Self {
        match bits & Self::MASK {
            0 => Self::Request,
            1 => Self::Response,
            _ => Self::Both,
        }
    }

    /// The two-bit encoding stored in `type_flags`.
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Lowercase name, as accepted by the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_lookup_is_exact() {
        assert_eq!(HttpMethod::from_bytes(b"GET"), Some(HttpMethod::GET));
        assert_eq!(HttpMethod::from_bytes(b"M-SEARCH"), Some(HttpMethod::MSEARCH));
        assert_eq!(HttpMethod::from_bytes(b"GETS"), None);
        assert_eq!(HttpMethod::from_bytes(b"get"), None);
    }

    #[test]
    fn method_prefixes() {
        assert!(HttpMethod::is_prefix(b"PRO"));
        assert!(HttpMethod::is_prefix(b"M-"));
        assert!(!HttpMethod::is_prefix(b"GETS"));
        assert!(!HttpMethod::is_prefix(b"X"));
    }

    #[test]
    fn max_len_covers_every_method() {
        let longest = HttpMethod::ALL.iter().map(|m| m.as_str().len()).max();
        assert_eq!(longest, Some(HttpMethod::MAX_LEN));
    }

    #[test]
    fn type_bits_round_trip() {
        for ty in [MessageType::Request, MessageType::Response, MessageType::Both] {
            assert_eq!(MessageType::from_bits(ty.bits()), ty);
            assert_eq!(MessageType::from_bits(0xfc | ty.bits()), ty);
        }
        assert_eq!(MessageType::from_bits(3), MessageType::Both);
    }
}
