//! Service Configuration
//!
//! Settings for the tunnel interface, the foreground notification and
//! logging. Every field has a default, so an empty TOML document is a
//! valid configuration.
//!
//! Route and MTU are not configurable: every tunnel captures `0.0.0.0/0`
//! at an MTU of 1500.
//!
//! ```toml
//! session_name = "VeilNet"
//! application_id = "app.veilnet.conflux"
//!
//! [notification]
//! message = "VeilNet is active"
//!
//! [log]
//! level = "debug"
//! format = "json"
//! ```

use crate::cidr::{Cidr, TunnelConfig};
use crate::error::{Result, SessionError};
use crate::tunnel::{DEFAULT_MTU, TunnelSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Session label for the tunnel interface
    pub session_name: String,
    /// Hosting application, excluded from the tunnel
    pub application_id: String,
    /// Foreground notification
    pub notification: NotificationConfig,
    /// Logging
    pub log: LogConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            session_name: "VeilNet".to_string(),
            application_id: "app.veilnet.conflux".to_string(),
            notification: NotificationConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Parse from a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SessionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.session_name.trim().is_empty() {
            return Err(SessionError::Config("session_name must not be empty".into()));
        }
        if self.application_id.trim().is_empty() {
            return Err(SessionError::Config("application_id must not be empty".into()));
        }
        if self.notification.channel_id.trim().is_empty() {
            return Err(SessionError::Config("notification.channel_id must not be empty".into()));
        }
        Ok(())
    }

    /// Provisioning parameters for a started engine
    pub fn tunnel_spec(&self, tunnel: &TunnelConfig) -> TunnelSpec {
        TunnelSpec::new(&self.session_name)
            .address(tunnel.local())
            .dns_server(tunnel.gateway)
            .route(Cidr::default_route())
            .mtu(DEFAULT_MTU)
            .disallow_application(&self.application_id)
    }
}

/// Foreground notification settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotificationConfig {
    pub id: u32,
    pub channel_id: String,
    pub channel_name: String,
    pub channel_description: String,
    pub title: String,
    pub message: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            id: 1,
            channel_id: "VeilNet".to_string(),
            channel_name: "VeilNet".to_string(),
            channel_description: "VeilNet Service Channel".to_string(),
            title: "VeilNet".to_string(),
            message: "VeilNet is active".to_string(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Filter directive, e.g. "info" or "veil_service=debug"
    pub level: String,
    pub format: LogFormat,
    /// Append to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            file: None,
        }
    }
}
