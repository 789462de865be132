//! Session Lifecycle Controller
//!
//! Drives the anchor engine, the tunnel provisioner and the notification
//! presenter through one start/stop protocol and reports every command's
//! outcome exactly once.
//!
//! # States
//!
//! ```text
//!            Start ok                 attach scheduled
//!   Idle ──────────────▶ Starting ───────────────────▶ Running
//!    ▲                      │                             │
//!    │     any failure      │                             │ Stop / Revoke / Destroy
//!    ├──────────────────────┘                             ▼
//!    └──────────────────────────────────────────────── Stopping
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut controller = SessionController::new(config, factory, provisioner, presenter)?;
//!
//! let (callback, result) = ResultCallback::channel();
//! let directive = controller
//!     .handle_start(StartRequest::new(guardian, token), Some(callback))
//!     .await;
//!
//! assert!(result.recv()?.is_success());
//! assert_eq!(directive, HostDirective::KeepResident);
//! ```

use crate::callback::{CommandResult, ResultCallback, report};
use crate::cidr::TunnelConfig;
use crate::command::{Command, HostDirective, StartRequest};
use crate::config::ServiceConfig;
use crate::engine::{AnchorEngine, EngineFactory, StartOptions};
use crate::error::{Result, SessionError};
use crate::notification::{Notification, NotificationPresenter, present};
use crate::session::{Session, SessionEvent, SessionState, SessionStatus, TeardownReason};
use crate::tunnel::{TunnelDescriptor, TunnelProvisioner};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

/// Capacity of the event broadcast channel
const EVENT_CAPACITY: usize = 64;

/// Owns the process-wide session and serializes its transitions
pub struct SessionController {
    config: ServiceConfig,
    engines: Arc<dyn EngineFactory>,
    provisioner: Arc<dyn TunnelProvisioner>,
    presenter: Arc<dyn NotificationPresenter>,
    /// Current state, readable from other tasks
    state: Arc<RwLock<SessionState>>,
    /// The active session, if any
    session: Option<Session>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    /// Create an idle controller. Fails if `config` does not validate.
    pub fn new(
        config: ServiceConfig,
        engines: Arc<dyn EngineFactory>,
        provisioner: Arc<dyn TunnelProvisioner>,
        presenter: Arc<dyn NotificationPresenter>,
    ) -> Result<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            config,
            engines,
            provisioner,
            presenter,
            state: Arc::new(RwLock::new(SessionState::Idle)),
            session: None,
            events,
        })
    }

    /// Get current state
    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Snapshot of state, addressing and uptime
    pub async fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state().await,
            tunnel: self.session.as_ref().map(|s| *s.tunnel()),
            uptime: self.session.as_ref().map(Session::uptime),
            attaching: self.session.as_ref().is_some_and(Session::is_attaching),
        }
    }

    /// Route a host command to its handler
    pub async fn dispatch(&mut self, command: Command) -> HostDirective {
        debug!("Dispatching {} command", command.name());

        match command {
            Command::Start { request, callback } => self.handle_start(request, callback).await,
            Command::Stop { callback } => self.handle_stop(callback).await,
            Command::Revoke => {
                self.handle_teardown(TeardownReason::Revoke).await;
                HostDirective::Terminate
            }
            Command::Destroy => {
                self.handle_teardown(TeardownReason::Destroy).await;
                HostDirective::Terminate
            }
            Command::Unrecognized { action, callback } => {
                debug!("Ignoring unrecognized action {:?}", action);
                if let Some(callback) = callback {
                    callback.discard();
                }
                HostDirective::Terminate
            }
            Command::Ignored => HostDirective::Terminate,
        }
    }

    /// Bring up a session and report the outcome once.
    ///
    /// Success means the tunnel is provisioned and the engine attach has been
    /// scheduled; attach itself completes in the background.
    pub async fn handle_start(
        &mut self,
        request: StartRequest,
        callback: Option<ResultCallback>,
    ) -> HostDirective {
        let current = self.state().await;
        if current.is_active() {
            warn!("Start rejected: session is {}", current);
            report(
                callback,
                CommandResult::failure(SessionError::AlreadyActive.report_message()),
            );
            return if current.is_running() {
                HostDirective::KeepResident
            } else {
                HostDirective::Terminate
            };
        }

        match self.start_session(&request).await {
            Ok(tunnel) => {
                info!("VeilNet session running ({})", tunnel);
                report(callback, CommandResult::success());
                HostDirective::KeepResident
            }
            Err(e) => {
                warn!("VeilNet start failed: {}", e);
                self.set_state(SessionState::Idle).await;
                report(callback, CommandResult::failure(e.report_message()));
                HostDirective::Terminate
            }
        }
    }

    /// Tear down whatever is running and report success.
    pub async fn handle_stop(&mut self, callback: Option<ResultCallback>) -> HostDirective {
        self.handle_teardown(TeardownReason::Stop).await;
        report(callback, CommandResult::success());
        HostDirective::Terminate
    }

    /// Release the session without reporting. Used for Stop, Revoke and
    /// Destroy; safe to call when idle.
    pub async fn handle_teardown(&mut self, reason: TeardownReason) {
        let Some(session) = self.session.take() else {
            debug!("Teardown ({}) with no active session", reason);
            self.set_state(SessionState::Idle).await;
            return;
        };

        info!("Tearing down VeilNet session ({})", reason);
        self.set_state(SessionState::Stopping).await;

        // Cancels attach, stops the engine, closes the descriptor
        drop(session);
        self.presenter.dismiss(self.config.notification.id);

        self.set_state(SessionState::Idle).await;
        let _ = self.events.send(SessionEvent::TornDown { reason });
    }

    async fn start_session(&mut self, request: &StartRequest) -> Result<TunnelConfig> {
        let (guardian, token) = request.credentials().ok_or(SessionError::Validation)?;

        self.set_state(SessionState::Starting).await;
        info!("Starting anchor against {}", guardian);

        let engine = self.engines.create();
        engine
            .start(guardian, token, StartOptions::DEFAULT)
            .map_err(SessionError::EngineStart)?;

        let (tunnel, descriptor) = match self.provision(engine.as_ref()) {
            Ok(provisioned) => provisioned,
            Err(e) => {
                // Engine is up but has no tunnel; it goes down with this attempt
                if let Err(stop_err) = engine.stop() {
                    debug!("Ignoring engine stop failure: {}", stop_err);
                }
                return Err(e);
            }
        };

        let mut session = Session::establish(engine, descriptor, tunnel);
        session.spawn_attach(self.events.clone());
        self.session = Some(session);

        let notification = Notification::active(&self.config.notification);
        if let Err(e) = present(self.presenter.as_ref(), &notification) {
            warn!("Foreground notification unavailable: {}", e);
        }

        self.set_state(SessionState::Running).await;
        Ok(tunnel)
    }

    fn provision(&self, engine: &dyn AnchorEngine) -> Result<(TunnelConfig, TunnelDescriptor)> {
        let tunnel = TunnelConfig::from_cidrs(&engine.cidr(), &engine.gateway_cidr())?;
        debug!("Engine assigned {}", tunnel);

        let spec = self.config.tunnel_spec(&tunnel);
        let descriptor = self
            .provisioner
            .establish(&spec)
            .map_err(SessionError::Provisioning)?;

        Ok((tunnel, descriptor))
    }

    async fn set_state(&self, new: SessionState) {
        let old = {
            let mut state = self.state.write().await;
            std::mem::replace(&mut *state, new)
        };

        if old != new {
            debug!("Session state {} -> {}", old, new);
            let _ = self.events.send(SessionEvent::StateChanged { old, new });
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if self.session.take().is_some() {
            debug!("Controller dropped with an active session; released");
            self.presenter.dismiss(self.config.notification.id);
        }
    }
}
