//! Transport strategies behind the [`Connector`](crate::Connector).
//!
//! - [`RequestResponseTransport`]: one HTTP POST per message, the response
//!   body goes to a fixed callback.
//! - [`PersistentTransport`]: one long-lived WebSocket, reopened on demand,
//!   inbound frames go to a swappable callback.

mod persistent;
mod request_response;

pub use persistent::PersistentTransport;
pub use request_response::RequestResponseTransport;

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Receive-callback: invoked with each inbound payload.
pub type Callback = Arc<dyn Fn(String) + Send + Sync>;

/// Common capability of both transports.
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Hand `message` to the transport. Never blocks and never fails; the
    /// outcome is observed only through the receive-callback.
    fn send(&self, message: String);
}

/// Which transport a connector uses. Config tags are `"AJAX"` and `"WS"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    #[serde(rename = "AJAX", alias = "ajax", alias = "request-response")]
    RequestResponse,
    #[serde(rename = "WS", alias = "ws", alias = "persistent")]
    Persistent,
}

impl TransportKind {
    pub fn tag(self) -> &'static str {
        match self {
            TransportKind::RequestResponse => "AJAX",
            TransportKind::Persistent => "WS",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::RequestResponse => write!(f, "request-response"),
            TransportKind::Persistent => write!(f, "persistent"),
        }
    }
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ajax" | "request-response" | "http" => Ok(TransportKind::RequestResponse),
            "ws" | "persistent" | "websocket" => Ok(TransportKind::Persistent),
            _ => Err(ConfigError::UnknownTransport(s.to_string())),
        }
    }
}

/// What happens to messages sent while the persistent channel is still
/// connecting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueuePolicy {
    /// Every queued message is sent exactly once, in submission order.
    #[default]
    Ordered,
    /// Only the most recently queued message is sent; earlier ones are dropped.
    LastWriteWins,
}

/// State of the persistent channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Connecting,
    Open,
    Closed,
}

/// Poison-tolerant lock. Critical sections only swap fields.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_config_tags_case_insensitively() {
        assert_eq!("AJAX".parse::<TransportKind>().unwrap(), TransportKind::RequestResponse);
        assert_eq!("ws".parse::<TransportKind>().unwrap(), TransportKind::Persistent);
        assert_eq!(
            "request-response".parse::<TransportKind>().unwrap(),
            TransportKind::RequestResponse
        );
        assert!(matches!(
            "carrier-pigeon".parse::<TransportKind>(),
            Err(ConfigError::UnknownTransport(_))
        ));
    }

    #[test]
    fn kind_serializes_to_tag() {
        let yaml = serde_yaml::to_string(&TransportKind::Persistent).unwrap();
        assert_eq!(yaml.trim(), "WS");
        let kind: TransportKind = serde_yaml::from_str("persistent").unwrap();
        assert_eq!(kind, TransportKind::Persistent);
        assert_eq!(TransportKind::RequestResponse.tag(), "AJAX");
    }

    #[test]
    fn queue_policy_defaults_to_ordered() {
        assert_eq!(QueuePolicy::default(), QueuePolicy::Ordered);
        let p: QueuePolicy = serde_yaml::from_str("last-write-wins").unwrap();
        assert_eq!(p, QueuePolicy::LastWriteWins);
    }
}
