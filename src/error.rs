// Error kinds surfaced by the RTMP core

use std::io;

use thiserror::Error;

/// Errors produced while negotiating, parsing or dispatching RTMP traffic.
///
/// Every variant below is fatal to the connection it occurred on, except
/// [`RtmpError::Unknown`], which callers log and then continue past.
#[derive(Debug, Error)]
pub enum RtmpError {
    /// Transport read/write failure.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Neither the simple nor either digest scheme validated C1.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// Unknown basic-header format or a chunk whose payload was truncated.
    #[error("malformed chunk: {0}")]
    MalformedChunk(String),

    /// Unknown AMF type byte or a value truncated mid-decode.
    #[error("malformed AMF: {0}")]
    MalformedAmf(String),

    /// A command object failed a structural expectation (missing/mistyped field).
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Unrecognized message type or command name. Not fatal: log and ignore.
    #[error("unknown: {0}")]
    Unknown(String),
}

pub type RtmpResult<T> = Result<T, RtmpError>;
