//! Backend endpoint: host plus route suffix, and the scheme used to reach it.

use std::fmt;

/// Where a connector sends its messages.
///
/// The address is host + route (e.g. `localhost:7000/best/`). The scheme is
/// added per transport: `wss://`/`ws://` for the persistent channel and
/// `https://`/`http://` for request/response calls. An address that already
/// carries a scheme is used as-is. Nothing else is validated; a malformed
/// address shows up as a connection failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    address: String,
    secure: bool,
}

impl Endpoint {
    /// Secure endpoint (`wss://` / `https://`).
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            secure: true,
        }
    }

    /// Join a host and a route suffix.
    pub fn from_parts(host: &str, route: &str) -> Self {
        Self::new(format!("{}{}", host, route))
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn ws_url(&self) -> String {
        self.with_scheme(if self.secure { "wss" } else { "ws" })
    }

    pub fn http_url(&self) -> String {
        self.with_scheme(if self.secure { "https" } else { "http" })
    }

    fn with_scheme(&self, scheme: &str) -> String {
        if self.address.contains("://") {
            self.address.clone()
        } else {
            format!("{}://{}", scheme, self.address)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

impl From<&str> for Endpoint {
    fn from(address: &str) -> Self {
        Endpoint::new(address)
    }
}

impl From<String> for Endpoint {
    fn from(address: String) -> Self {
        Endpoint::new(address)
    }
}
