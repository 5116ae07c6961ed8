//! Error types for the MUVE client library.

use thiserror::Error;

use crate::transport::TransportKind;

/// Errors returned by [`Connector`](crate::Connector) operations.
///
/// `send` never fails; transport problems are logged and recovered from by
/// reopening the channel on the next send.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    /// The transport holds one fixed callback for its lifetime.
    #[error("receive callback cannot be replaced on a {kind} transport")]
    CallbackNotSwappable { kind: TransportKind },
}

/// Failures inside a transport task. Logged, never surfaced to callers.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status; the callback is not invoked.
    #[error("server responded with status {0}")]
    Status(u16),
}

/// Config load/save error.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unknown transport kind: {0}")]
    UnknownTransport(String),
}
