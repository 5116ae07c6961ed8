//! Persistent WebSocket transport with reopen-on-send and a swappable callback.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::{lock, Callback, ChannelStatus, QueuePolicy, Transport, TransportKind};
use crate::endpoint::Endpoint;
use crate::error::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Channel state guarded by the transport's mutex.
///
/// `generation` increases every time a channel is opened. Tasks belonging to
/// an older generation leave the state alone, so at most one channel is live.
struct Channel {
    generation: u64,
    state: ChannelState,
}

enum ChannelState {
    Connecting { pending: VecDeque<String> },
    Open { outbound: mpsc::UnboundedSender<String> },
    Closed,
}

impl ChannelState {
    fn status(&self) -> ChannelStatus {
        match self {
            ChannelState::Connecting { .. } => ChannelStatus::Connecting,
            ChannelState::Open { .. } => ChannelStatus::Open,
            ChannelState::Closed => ChannelStatus::Closed,
        }
    }
}

/// Long-lived duplex channel to one endpoint.
///
/// The channel opens on construction. A send while connecting is queued
/// according to the [`QueuePolicy`]; a send after the channel closed opens a
/// new one and delivers the message once it is ready. Inbound text frames go
/// to whichever callback is registered when they arrive.
///
/// Construction and `send` spawn Tokio tasks and must run inside a runtime.
pub struct PersistentTransport {
    policy: QueuePolicy,
    shared: Shared,
}

/// State shared between the transport handle and its channel tasks.
#[derive(Clone)]
struct Shared {
    url: String,
    callback: Arc<Mutex<Callback>>,
    channel: Arc<Mutex<Channel>>,
}

impl Shared {
    /// Start a new channel generation that will flush `pending` once open.
    /// `channel` must be the locked contents of `self.channel`.
    fn reopen(&self, channel: &mut Channel, pending: VecDeque<String>) {
        channel.generation += 1;
        channel.state = ChannelState::Connecting { pending };
        tracing::debug!(url = %self.url, generation = channel.generation, "opening channel");
        tokio::spawn(run_channel(self.clone(), channel.generation));
    }

    fn is_current(&self, generation: u64) -> bool {
        lock(&self.channel).generation == generation
    }

    /// Move the channel to `Closed` unless a newer generation has replaced it.
    fn mark_closed(&self, generation: u64) {
        let mut channel = lock(&self.channel);
        if channel.generation == generation {
            channel.state = ChannelState::Closed;
        }
    }

    fn dispatch(&self, payload: String) {
        let handler = lock(&self.callback).clone();
        handler(payload);
    }
}

impl PersistentTransport {
    pub fn open(endpoint: &Endpoint, callback: Callback, policy: QueuePolicy) -> Self {
        let shared = Shared {
            url: endpoint.ws_url(),
            callback: Arc::new(Mutex::new(callback)),
            channel: Arc::new(Mutex::new(Channel {
                generation: 0,
                state: ChannelState::Closed,
            })),
        };
        {
            let mut channel = lock(&shared.channel);
            shared.reopen(&mut channel, VecDeque::new());
        }
        Self { policy, shared }
    }

    /// Replace the handler for subsequent inbound frames. The channel is untouched.
    pub fn set_callback(&self, callback: Callback) {
        *lock(&self.shared.callback) = callback;
    }

    pub fn status(&self) -> ChannelStatus {
        lock(&self.shared.channel).state.status()
    }

    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }
}

impl Transport for PersistentTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Persistent
    }

    fn send(&self, message: String) {
        let mut channel = lock(&self.shared.channel);
        let reopen_with = match &mut channel.state {
            ChannelState::Open { outbound } => outbound.send(message).err().map(|e| e.0),
            ChannelState::Connecting { pending } => {
                if self.policy == QueuePolicy::LastWriteWins && !pending.is_empty() {
                    tracing::debug!(dropped = pending.len(), "replacing queued message");
                    pending.clear();
                }
                pending.push_back(message);
                None
            }
            ChannelState::Closed => Some(message),
        };
        if let Some(message) = reopen_with {
            self.shared.reopen(&mut channel, VecDeque::from([message]));
        }
    }
}

impl Drop for PersistentTransport {
    /// Retires the live generation: the writer sends a close frame and the
    /// reader stops delivering frames.
    fn drop(&mut self) {
        let mut channel = lock(&self.shared.channel);
        channel.generation += 1;
        channel.state = ChannelState::Closed;
    }
}

/// Connect, flush the queued messages, then pump frames until the socket ends
/// or the generation is retired.
async fn run_channel(shared: Shared, generation: u64) {
    let url = shared.url.clone();
    let ws_stream = match connect(&url).await {
        Ok(ws) => ws,
        Err(e) => {
            let dropped = {
                let guard = lock(&shared.channel);
                match &guard.state {
                    ChannelState::Connecting { pending } if guard.generation == generation => {
                        pending.len()
                    }
                    _ => 0,
                }
            };
            tracing::warn!(url = %url, error = %e, dropped, "channel failed to open");
            shared.mark_closed(generation);
            return;
        }
    };
    let (mut sink, mut stream) = ws_stream.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();

    {
        let mut guard = lock(&shared.channel);
        if guard.generation != generation {
            tracing::debug!(url = %url, generation, "channel superseded before opening");
            return;
        }
        let previous = std::mem::replace(
            &mut guard.state,
            ChannelState::Open {
                outbound: outbound.clone(),
            },
        );
        if let ChannelState::Connecting { pending } = previous {
            for message in pending {
                let _ = outbound.send(message);
            }
        }
    }
    // The state now holds the only sender; the writer ends when it is dropped.
    drop(outbound);
    tracing::info!(url = %url, generation, "channel open");

    let writer = shared.clone();
    tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            tracing::debug!(generation, bytes = message.len(), "sending frame");
            if let Err(e) = sink.send(Message::Text(message.clone())).await {
                // Holding the lock keeps `send` from queueing behind the drain.
                let mut guard = lock(&writer.channel);
                let mut pending = VecDeque::from([message]);
                while let Ok(queued) = outbound_rx.try_recv() {
                    pending.push_back(queued);
                }
                if guard.generation == generation {
                    tracing::warn!(generation, error = %e, requeued = pending.len(), "send failed, reopening channel");
                    writer.reopen(&mut guard, pending);
                } else {
                    tracing::warn!(generation, error = %e, dropped = pending.len(), "send failed on retired channel");
                }
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(item) = stream.next().await {
        let payload = match item {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(generation, error = %e, "receive failed");
                break;
            }
        };
        if !shared.is_current(generation) {
            tracing::debug!(generation, "channel retired, discarding frame");
            break;
        }
        tracing::debug!(generation, bytes = payload.len(), "frame received");
        shared.dispatch(payload);
    }

    tracing::info!(url = %url, generation, "channel closed");
    shared.mark_closed(generation);
}

async fn connect(url: &str) -> Result<WsStream, TransportError> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(url).await?;
    Ok(ws_stream)
}
