//! SAM v3 request/reply grammar.
//!
//! Requests are single `\n`-terminated lines. Replies are a single line of
//! space-separated tokens where the first two form the reply category
//! (`HELLO REPLY`, `SESSION STATUS`, `STREAM STATUS`, `NAMING REPLY`,
//! `DEST REPLY`) and the remainder are `KEY=VALUE` pairs. Values carry no
//! quoting.

use std::fmt;

/// Session style carried by SESSION CREATE.
///
/// Only `Stream` is driven by this crate; the other styles are kept because
/// the SAM grammar defines them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStyle {
    /// Virtual-circuit streams (the only style this client drives).
    Stream,
    /// Repliable datagrams.
    Datagram,
    /// Raw (non-repliable) datagrams.
    Raw,
}

impl SessionStyle {
    fn as_str(self) -> &'static str {
        match self {
            SessionStyle::Stream => "STREAM",
            SessionStyle::Datagram => "DATAGRAM",
            SessionStyle::Raw => "RAW",
        }
    }
}

/// Classified `RESULT=` value of a bridge reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    /// The request succeeded.
    Ok,
    /// The destination is already bound to another session.
    DuplicatedDest,
    /// The session id is already in use on the bridge.
    DuplicatedId,
    /// Generic router-side failure.
    I2pError,
    /// The bridge does not know the session id.
    InvalidId,
    /// The destination key is malformed.
    InvalidKey,
    /// The remote peer could not be reached.
    CantReachPeer,
    /// The request timed out inside the router.
    Timeout,
    /// No protocol version in the offered range is supported.
    NoVersion,
    /// Name lookup found no entry.
    KeyNotFound,
    /// The remote destination is unknown to the network.
    PeerNotFound,
    /// The session already has a pending ACCEPT.
    AlreadyAccepting,
    /// The `RESULT=` value matched no known token.
    CannotParse,
}

impl ReplyStatus {
    /// Classify the `RESULT=` field of a reply line.
    pub fn classify(reply: &str) -> ReplyStatus {
        match get_value(reply, "RESULT") {
            "OK" => ReplyStatus::Ok,
            "DUPLICATED_DEST" => ReplyStatus::DuplicatedDest,
            "DUPLICATED_ID" => ReplyStatus::DuplicatedId,
            "I2P_ERROR" => ReplyStatus::I2pError,
            "INVALID_ID" => ReplyStatus::InvalidId,
            "INVALID_KEY" => ReplyStatus::InvalidKey,
            "CANT_REACH_PEER" => ReplyStatus::CantReachPeer,
            "TIMEOUT" => ReplyStatus::Timeout,
            "NOVERSION" => ReplyStatus::NoVersion,
            "KEY_NOT_FOUND" => ReplyStatus::KeyNotFound,
            "PEER_NOT_FOUND" => ReplyStatus::PeerNotFound,
            "ALREADY_ACCEPTING" => ReplyStatus::AlreadyAccepting,
            _ => ReplyStatus::CannotParse,
        }
    }
}

impl fmt::Display for ReplyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            ReplyStatus::Ok => "OK",
            ReplyStatus::DuplicatedDest => "DUPLICATED_DEST",
            ReplyStatus::DuplicatedId => "DUPLICATED_ID",
            ReplyStatus::I2pError => "I2P_ERROR",
            ReplyStatus::InvalidId => "INVALID_ID",
            ReplyStatus::InvalidKey => "INVALID_KEY",
            ReplyStatus::CantReachPeer => "CANT_REACH_PEER",
            ReplyStatus::Timeout => "TIMEOUT",
            ReplyStatus::NoVersion => "NOVERSION",
            ReplyStatus::KeyNotFound => "KEY_NOT_FOUND",
            ReplyStatus::PeerNotFound => "PEER_NOT_FOUND",
            ReplyStatus::AlreadyAccepting => "ALREADY_ACCEPTING",
            ReplyStatus::CannotParse => "CANNOT_PARSE_ERROR",
        };
        f.write_str(token)
    }
}

/// Extract the value of `key` from a reply line.
///
/// Returns the substring after the first occurrence of `key=` up to the
/// next space, or (when the remainder has no space) the next newline, or
/// the end of the line. Absent keys and the empty key yield an empty
/// string.
pub fn get_value<'a>(reply: &'a str, key: &str) -> &'a str {
    if key.is_empty() {
        return "";
    }
    let pattern = format!("{key}=");
    let Some(start) = reply.find(&pattern) else {
        return "";
    };
    let value = &reply[start + pattern.len()..];
    let end = value
        .find(' ')
        .or_else(|| value.find('\n'))
        .unwrap_or(value.len());
    &value[..end]
}

// =============================================================================
// Request builders
// =============================================================================

/// `HELLO VERSION` — version negotiation, first line on every socket.
pub fn hello(min_version: &str, max_version: &str) -> String {
    format!("HELLO VERSION MIN={min_version} MAX={max_version}\n")
}

/// `SESSION CREATE` — bind a session id to a destination on this socket.
///
/// `destination` is either a private key blob or `TRANSIENT`; `options`
/// are I2CP options passed through verbatim.
pub fn session_create(
    style: SessionStyle,
    id: &str,
    nickname: &str,
    destination: &str,
    options: &str,
) -> String {
    format!(
        "SESSION CREATE STYLE={} ID={} DESTINATION={} inbound.nickname={} {}\n",
        style.as_str(),
        id,
        destination,
        nickname,
        options
    )
}

/// `STREAM ACCEPT` — wait for one inbound stream on this socket.
pub fn stream_accept(id: &str, silent: bool) -> String {
    format!("STREAM ACCEPT ID={} SILENT={}\n", id, bool_str(silent))
}

/// `STREAM CONNECT` — open an outbound stream to `destination`.
pub fn stream_connect(id: &str, destination: &str, silent: bool) -> String {
    format!(
        "STREAM CONNECT ID={} DESTINATION={} SILENT={}\n",
        id,
        destination,
        bool_str(silent)
    )
}

/// `STREAM FORWARD` — route inbound streams to a local TCP `host:port`.
pub fn stream_forward(id: &str, host: &str, port: u16, silent: bool) -> String {
    format!(
        "STREAM FORWARD ID={} PORT={} HOST={} SILENT={}\n",
        id,
        port,
        host,
        bool_str(silent)
    )
}

/// `NAMING LOOKUP` — resolve a name to a destination key.
pub fn naming_lookup(name: &str) -> String {
    format!("NAMING LOOKUP NAME={name}\n")
}

/// `DEST GENERATE` — mint a destination key pair without a session.
pub fn dest_generate() -> String {
    "DEST GENERATE\n".to_string()
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
