//! Error types for the star chart client.
//!
//! # Design
//! Expected failure shapes (server-explained errors, malformed bodies,
//! unreachable hosts) are values of [`ApiResult`](crate::ApiResult), not
//! errors. The types here cover what the transport reports and the single
//! fault the client escalates: a failed response whose body cannot be read.

use thiserror::Error;

/// Faults reported by a [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No response was obtained (DNS, connect, TLS, timeout).
    #[error("transport failure: {0}")]
    Connect(String),

    /// A response arrived but its body could not be read.
    #[error("failed to read body of HTTP {status} response: {message}")]
    Body { status: u16, message: String },
}

/// Fatal faults escalated by [`StarChartClient`](crate::StarChartClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The server answered with a failure status and the body was unreadable,
    /// so no result can be constructed.
    #[error("unreadable body on HTTP {status} response: {message}")]
    UnreadableErrorBody { status: u16, message: String },
}
