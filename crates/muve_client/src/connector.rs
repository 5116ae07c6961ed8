//! Connector: send queries to the MUVE backend over a persistent WebSocket or
//! one-shot HTTP calls, delivering responses to a receive-callback.

use std::sync::Arc;

use crate::endpoint::Endpoint;
use crate::error::ConnectorError;
use crate::transport::{
    Callback, ChannelStatus, PersistentTransport, QueuePolicy, RequestResponseTransport,
    Transport, TransportKind,
};

/// The transport a connector was built with. Chosen once, never mixed.
enum Sender {
    RequestResponse(RequestResponseTransport),
    Persistent(PersistentTransport),
}

/// Transport-agnostic query sender.
///
/// ```no_run
/// use muve_client::{Connector, Endpoint, TransportKind};
///
/// # async fn demo() {
/// let connector = Connector::new(
///     Endpoint::from_parts("localhost:7000", "/best/"),
///     TransportKind::Persistent,
///     |payload| println!("final: {payload}"),
/// );
/// connector.send("dataset1;count of rows");
///
/// // Switch to incremental rendering on the same live channel.
/// connector
///     .set_callback(|payload| println!("partial: {payload}"))
///     .unwrap();
/// # }
/// ```
pub struct Connector {
    endpoint: Endpoint,
    sender: Sender,
}

impl Connector {
    /// Build a connector with the default [`QueuePolicy`].
    ///
    /// A persistent connector opens its channel immediately, so this must be
    /// called inside a Tokio runtime.
    pub fn new<F>(endpoint: Endpoint, kind: TransportKind, callback: F) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        Self::with_policy(endpoint, kind, callback, QueuePolicy::default())
    }

    /// Build a connector with an explicit policy for messages sent while the
    /// persistent channel is connecting. Ignored for request/response.
    pub fn with_policy<F>(endpoint: Endpoint, kind: TransportKind, callback: F, policy: QueuePolicy) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        let sender = match kind {
            TransportKind::RequestResponse => {
                Sender::RequestResponse(RequestResponseTransport::new(&endpoint, callback))
            }
            TransportKind::Persistent => {
                Sender::Persistent(PersistentTransport::open(&endpoint, callback, policy))
            }
        };
        tracing::debug!(endpoint = %endpoint, kind = %kind, "connector created");
        Self { endpoint, sender }
    }

    /// Send one message. Responses arrive asynchronously on the callback.
    pub fn send(&self, message: impl Into<String>) {
        self.transport().send(message.into());
    }

    /// Replace the receive-callback of a persistent connector without touching
    /// its channel. Request/response connectors keep their callback and return
    /// [`ConnectorError::CallbackNotSwappable`].
    pub fn set_callback<F>(&self, callback: F) -> Result<(), ConnectorError>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        match &self.sender {
            Sender::Persistent(transport) => {
                transport.set_callback(Arc::new(callback));
                Ok(())
            }
            Sender::RequestResponse(_) => {
                tracing::warn!(endpoint = %self.endpoint, "set_callback on request-response connector");
                Err(ConnectorError::CallbackNotSwappable {
                    kind: TransportKind::RequestResponse,
                })
            }
        }
    }

    pub fn kind(&self) -> TransportKind {
        self.transport().kind()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Channel state for persistent connectors; `None` for request/response.
    pub fn status(&self) -> Option<ChannelStatus> {
        match &self.sender {
            Sender::Persistent(transport) => Some(transport.status()),
            Sender::RequestResponse(_) => None,
        }
    }

    fn transport(&self) -> &dyn Transport {
        match &self.sender {
            Sender::RequestResponse(transport) => transport,
            Sender::Persistent(transport) => transport,
        }
    }
}
