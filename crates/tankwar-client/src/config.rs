//! Client Configuration - Connection and recording settings
//!
//! Settings are plain serde data, so they can be built in code or loaded
//! from RON. Every field has a default; a RON file only needs the fields
//! it changes:
//!
//! ```
//! use tankwar_client::ClientConfig;
//!
//! let config = ClientConfig::from_ron_str(r#"(
//!     address: "10.0.0.5:7878",
//!     recorder: (max_capacity: Some(1024)),
//! )"#).unwrap();
//!
//! assert_eq!(config.address, "10.0.0.5:7878");
//! assert_eq!(config.acquire_timeout_ms, 1000);
//! assert_eq!(config.recorder.max_capacity, Some(1024));
//! ```

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tankwar_db::RecorderConfig;

/// Default simulation address
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:7878";

/// Default frame size limit (64 MiB)
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Configuration for a [`GameClient`](crate::GameClient)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Simulation address, `host:port`
    pub address: String,
    /// TCP connect timeout, `0` waits as long as the OS does
    pub connect_timeout_ms: u64,
    /// Wait used by `acquire_entity_default`
    pub acquire_timeout_ms: u64,
    /// Largest frame the ingestion loop accepts, `None` for unlimited
    pub max_frame_len: Option<usize>,
    /// Send a `TankListRequest` right after connecting
    pub request_tank_list_on_connect: bool,
    /// Session recording
    pub recorder: RecorderConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            connect_timeout_ms: 5000,
            acquire_timeout_ms: 1000,
            max_frame_len: Some(DEFAULT_MAX_FRAME_LEN),
            request_tank_list_on_connect: true,
            recorder: RecorderConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Default settings pointed at `address`
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Parse RON text
    pub fn from_ron_str(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Load a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        match self.connect_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.address, "127.0.0.1:7878");
        assert_eq!(config.connect_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.acquire_timeout(), Duration::from_secs(1));
        assert_eq!(config.max_frame_len, Some(64 * 1024 * 1024));
        assert!(config.request_tank_list_on_connect);
        assert!(config.recorder.enabled);
        assert_eq!(config.recorder.session_dir, None);
    }

    #[test]
    fn test_empty_ron_is_default() {
        assert_eq!(ClientConfig::from_ron_str("()").unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_zero_connect_timeout_means_none() {
        let config = ClientConfig::from_ron_str("(connect_timeout_ms: 0, max_frame_len: None)").unwrap();
        assert_eq!(config.connect_timeout(), None);
        assert_eq!(config.max_frame_len, None);
    }

    #[test]
    fn test_bad_ron_is_config_error() {
        let err = ClientConfig::from_ron_str("(address: 7)").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
