//! Client config load/save for `~/.muve/config.yaml`.
//! Sections: server (host, secure), routes, transport (per feature), queue_policy.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::endpoint::Endpoint;
use crate::error::ConfigError;
use crate::transport::{QueuePolicy, TransportKind};

pub const DEFAULT_HOST: &str = "localhost:7000";
pub const DEFAULT_ENGINE_ROUTE: &str = "/lucene/";
pub const DEFAULT_BEST_ROUTE: &str = "/best/";
pub const DEFAULT_CANDIDATES_ROUTE: &str = "/dataTone/";
pub const DEFAULT_QUERY_ROUTE: &str = "/query/";
pub const DEFAULT_STREAM_ROUTE: &str = "/stream/";
pub const DEFAULT_STUDY_ROUTE: &str = "/study";

/// Server section (host, secure).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ServerSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// `wss://`/`https://` when true (the default), `ws://`/`http://` otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
}

/// Route suffixes appended to the host.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct RoutesSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study: Option<String>,
}

/// Transport selection per feature (`"AJAX"` or `"WS"`).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TransportSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<TransportKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<TransportKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study: Option<TransportKind>,
}

/// Full client config.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub routes: RoutesSection,
    #[serde(default)]
    pub transport: TransportSection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_policy: Option<QueuePolicy>,
}

/// Client features that talk to the backend, each with its own route and
/// transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Main query engine.
    Engine,
    /// Baseline comparison UI (best interpretation only).
    Baseline,
    /// Study result submission.
    Study,
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "engine" => Ok(Feature::Engine),
            "baseline" => Ok(Feature::Baseline),
            "study" => Ok(Feature::Study),
            _ => Err(format!("unknown feature: {}", s)),
        }
    }
}

impl Config {
    pub fn host(&self) -> &str {
        self.server.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn secure(&self) -> bool {
        self.server.secure.unwrap_or(true)
    }

    pub fn queue_policy(&self) -> QueuePolicy {
        self.queue_policy.unwrap_or_default()
    }

    /// Endpoint for `route` on the configured host.
    pub fn endpoint(&self, route: &str) -> Endpoint {
        Endpoint::from_parts(self.host(), route).with_secure(self.secure())
    }

    pub fn route_for(&self, feature: Feature) -> &str {
        match feature {
            Feature::Engine => self.routes.engine.as_deref().unwrap_or(DEFAULT_ENGINE_ROUTE),
            Feature::Baseline => self.routes.best.as_deref().unwrap_or(DEFAULT_BEST_ROUTE),
            Feature::Study => self.routes.study.as_deref().unwrap_or(DEFAULT_STUDY_ROUTE),
        }
    }

    pub fn transport_for(&self, feature: Feature) -> TransportKind {
        let configured = match feature {
            Feature::Engine => self.transport.engine,
            Feature::Baseline => self.transport.baseline,
            Feature::Study => self.transport.study,
        };
        configured.unwrap_or(match feature {
            Feature::Engine | Feature::Baseline => TransportKind::Persistent,
            Feature::Study => TransportKind::RequestResponse,
        })
    }

    pub fn endpoint_for(&self, feature: Feature) -> Endpoint {
        self.endpoint(self.route_for(feature))
    }
}

/// Returns the default config file path: `~/.muve/config.yaml` (platform-specific).
pub fn default_config_path() -> Option<PathBuf> {
    let home = home_dir()?;
    Some(home.join(".muve").join("config.yaml"))
}

#[cfg(unix)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(windows)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE").map(PathBuf::from)
}

#[cfg(not(any(unix, windows)))]
fn home_dir() -> Option<PathBuf> {
    None
}

/// Load config from a YAML file.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config = serde_yaml::from_str(&contents)?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Save config to a YAML file. Creates parent directory if missing.
pub fn save(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend_layout() {
        let cfg = Config::default();
        assert_eq!(cfg.host(), "localhost:7000");
        assert!(cfg.secure());
        assert_eq!(cfg.transport_for(Feature::Engine), TransportKind::Persistent);
        assert_eq!(cfg.transport_for(Feature::Study), TransportKind::RequestResponse);
        assert_eq!(cfg.endpoint_for(Feature::Baseline).ws_url(), "wss://localhost:7000/best/");
        assert_eq!(cfg.queue_policy(), QueuePolicy::Ordered);
    }

    #[test]
    fn feature_names() {
        assert_eq!("Engine".parse::<Feature>().unwrap(), Feature::Engine);
        assert!("chart".parse::<Feature>().is_err());
    }
}
