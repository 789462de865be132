//! Anchor engine seam
//!
//! The VPN engine itself is an external component. This module only fixes
//! the shape the controller drives: start with credentials, report the
//! assigned addressing, attach to a tunnel file descriptor, stop.

use async_trait::async_trait;
use std::sync::Arc;

use crate::tunnel::RawTunFd;

/// Options passed to [`AnchorEngine::start`].
///
/// The controller always uses [`StartOptions::DEFAULT`]; the meaning of the
/// fields belongs to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartOptions {
    /// Opaque string argument
    pub extra: &'static str,
    /// Flag passed as `true`
    pub enabled: bool,
    /// Flag passed as `false`
    pub disabled: bool,
}

impl StartOptions {
    /// The fixed option set used for every session
    pub const DEFAULT: StartOptions = StartOptions {
        extra: "",
        enabled: true,
        disabled: false,
    };
}

impl Default for StartOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Engine failure. The message may be absent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .message.as_deref().unwrap_or("engine error"))]
pub struct EngineError {
    message: Option<String>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    pub fn without_message() -> Self {
        Self { message: None }
    }

    /// The engine-supplied message, if any
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// A single engine instance.
///
/// One handle is created per Start and dropped with its session.
#[async_trait]
pub trait AnchorEngine: Send + Sync {
    /// Connect to the guardian endpoint and authenticate
    fn start(
        &self,
        guardian: &str,
        token: &str,
        options: StartOptions,
    ) -> Result<(), EngineError>;

    /// Local tunnel address, `address/prefix`
    fn cidr(&self) -> String;

    /// Gateway address, `address/prefix`
    fn gateway_cidr(&self) -> String;

    /// Hand the tunnel descriptor to the engine. Runs for as long as the
    /// engine forwards packets.
    async fn attach(&self, fd: RawTunFd) -> Result<(), EngineError>;

    /// Stop the engine
    fn stop(&self) -> Result<(), EngineError>;
}

/// Produces a fresh engine handle for each session
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Arc<dyn AnchorEngine>;
}

impl<F> EngineFactory for F
where
    F: Fn() -> Arc<dyn AnchorEngine> + Send + Sync,
{
    fn create(&self) -> Arc<dyn AnchorEngine> {
        self()
    }
}
