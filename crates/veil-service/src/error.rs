//! Error taxonomy for the session controller.
//!
//! Every Start-path failure ends up as a [`SessionError`] whose
//! [`report_message`](SessionError::report_message) is what the caller sees
//! in the failure payload.

use crate::cidr::CidrError;
use crate::engine::EngineError;
use crate::tunnel::ProvisionError;

/// Message reported when either credential is absent.
pub const MISSING_CREDENTIALS: &str = "Guardian Url or VeilNet token is missing";

/// Fallback when the engine fails without a message.
pub const ENGINE_START_FALLBACK: &str = "Failed to start anchor";

/// Fallback when the tunnel provisioner fails without a message.
pub const PROVISION_FALLBACK: &str = "Failed to establish tunnel interface";

/// Controller errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{}", MISSING_CREDENTIALS)]
    Validation,

    #[error("VeilNet session is already running")]
    AlreadyActive,

    #[error("{}", .0.message().unwrap_or(ENGINE_START_FALLBACK))]
    EngineStart(EngineError),

    #[error("{0}")]
    ConfigParse(#[from] CidrError),

    #[error("{}", .0.message().unwrap_or(PROVISION_FALLBACK))]
    Provisioning(ProvisionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Service host is no longer running")]
    HostClosed,
}

impl SessionError {
    /// Message delivered to the result callback.
    ///
    /// Underlying messages pass through verbatim; the generic fallbacks are
    /// only used when the collaborator supplied nothing.
    pub fn report_message(&self) -> String {
        self.to_string()
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, SessionError>;
