//! MUVE query client library: a dual-transport connector (persistent WebSocket
//! or one-shot HTTP) with a swappable receive-callback, plus config and wire
//! payload helpers. Used by the `muve` terminal front end.

pub mod config;
pub mod connector;
pub mod endpoint;
pub mod error;
pub mod messages;
pub mod transport;

pub use config::{default_config_path, Config, Feature};
pub use connector::Connector;
pub use endpoint::Endpoint;
pub use error::{ConfigError, ConnectorError, TransportError};
pub use messages::{Delimiter, QueryMessage, RenderAction, RenderMode, ResponseFrame};
pub use transport::{Callback, ChannelStatus, QueuePolicy, Transport, TransportKind};
