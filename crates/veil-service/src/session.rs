//! The active tunnel session
//!
//! A [`Session`] bundles the engine handle, the tunnel descriptor and the
//! attach task. They are acquired together in [`Session::establish`] and
//! released together when the session is dropped, so neither can outlive
//! the other.

use crate::cidr::TunnelConfig;
use crate::engine::AnchorEngine;
use crate::tunnel::{RawTunFd, TunnelDescriptor};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// No session
    Idle,
    /// Engine and tunnel being brought up
    Starting,
    /// Tunnel provisioned, engine attached or attaching
    Running,
    /// Resources being released
    Stopping,
}

impl SessionState {
    /// Check if a session exists or is being set up
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionState::Idle)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// Why a session was torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TeardownReason {
    /// Stop command from the caller
    Stop,
    /// VPN permission revoked by the OS
    Revoke,
    /// Host process shutting down
    Destroy,
}

impl fmt::Display for TeardownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TeardownReason::Stop => "stop",
            TeardownReason::Revoke => "revoke",
            TeardownReason::Destroy => "destroy",
        };
        f.write_str(s)
    }
}

/// Lifecycle events broadcast by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged {
        old: SessionState,
        new: SessionState,
    },
    /// Engine attach scheduled on the given descriptor
    AttachStarted { fd: RawTunFd },
    /// Engine attach returned normally
    AttachCompleted,
    /// Engine attach failed after Start already reported success
    AttachFailed { message: String },
    TornDown { reason: TeardownReason },
}

/// Snapshot of the controller's session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub tunnel: Option<TunnelConfig>,
    pub uptime: Option<Duration>,
    /// Engine attach still in progress
    pub attaching: bool,
}

/// Engine handle, tunnel descriptor and attach task of one tunnel
pub struct Session {
    engine: Arc<dyn AnchorEngine>,
    descriptor: TunnelDescriptor,
    tunnel: TunnelConfig,
    attach: Option<JoinHandle<()>>,
    started_at: Instant,
}

impl Session {
    /// Take ownership of a started engine and its tunnel
    pub(crate) fn establish(
        engine: Arc<dyn AnchorEngine>,
        descriptor: TunnelDescriptor,
        tunnel: TunnelConfig,
    ) -> Self {
        Self {
            engine,
            descriptor,
            tunnel,
            attach: None,
            started_at: Instant::now(),
        }
    }

    pub fn tunnel(&self) -> &TunnelConfig {
        &self.tunnel
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Check if the attach task is still running
    pub fn is_attaching(&self) -> bool {
        self.attach.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Hand the descriptor to the engine on a background task.
    ///
    /// The result only reaches logs and `events`; the caller was already
    /// told the session is up.
    pub(crate) fn spawn_attach(&mut self, events: broadcast::Sender<SessionEvent>) {
        let engine = self.engine.clone();
        let fd = self.descriptor.raw_fd();

        let task = tokio::spawn(async move {
            let _ = events.send(SessionEvent::AttachStarted { fd });
            debug!("Attaching engine to tunnel descriptor {}", fd);

            match engine.attach(fd).await {
                Ok(()) => {
                    info!("Engine detached from tunnel descriptor {}", fd);
                    let _ = events.send(SessionEvent::AttachCompleted);
                }
                Err(e) => {
                    error!("Engine attach failed: {}", e);
                    let _ = events.send(SessionEvent::AttachFailed {
                        message: e.to_string(),
                    });
                }
            }
        });

        self.attach = Some(task);
    }

    /// Cancel attach, stop the engine, close the descriptor.
    ///
    /// Best-effort: failures are logged and never stop the remaining steps.
    fn release(&mut self) {
        if let Some(task) = self.attach.take() {
            task.abort();
        }

        if let Err(e) = self.engine.stop() {
            debug!("Ignoring engine stop failure: {}", e);
        }

        if let Err(e) = self.descriptor.close() {
            warn!("Ignoring tunnel close failure: {}", e);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}
