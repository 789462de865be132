//! VeilNet Service - VPN session lifecycle controller
//!
//! Brings a VeilNet anchor session up and down on behalf of a platform
//! service host. The anchor engine, the OS tunnel interface and the
//! foreground notification are collaborators behind traits; this crate owns
//! the ordering between them and the single result report per command.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Service Host Task                        │
//! │                                                               │
//! │  Start/Stop ┌───────────────────┐ start/cidr  ┌────────────┐  │
//! │  ──────────▶│ SessionController │────────────▶│   Anchor   │  │
//! │  Revoke     │  (state machine)  │ attach(fd)  │   Engine   │  │
//! │  Destroy    └─────────┬─────────┘────────────▶└────────────┘  │
//! │        ◀── result     │ establish                             │
//! │           callback    ▼                                       │
//! │             ┌───────────────────┐      ┌──────────────────┐   │
//! │             │ TunnelProvisioner │      │   Notification   │   │
//! │             │  (TUN interface)  │      │    Presenter     │   │
//! │             └───────────────────┘      └──────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Guarantees
//!
//! - **Exactly one report** per Start and Stop; none for Revoke or Destroy
//! - **Paired resources**: engine and tunnel descriptor are released together
//! - **Idempotent teardown**: Stop succeeds whether or not a session exists
//! - **Non-blocking start**: success is reported once attach is scheduled

mod callback;
mod cidr;
mod command;
mod config;
mod controller;
mod engine;
mod error;
mod host;
mod logging;
mod notification;
mod session;
mod tunnel;

#[cfg(test)]
mod testing;

pub use callback::{CommandResult, ErrorPayload, ResultCallback, ResultCode};
pub use cidr::{Cidr, CidrError, MAX_PREFIX_LEN, TunnelConfig};
pub use command::{
    ACTION_START, ACTION_STOP, Command, EXTRA_GUARDIAN, EXTRA_TOKEN, HostDirective, HostIntent,
    StartRequest,
};
pub use config::{LogConfig, LogFormat, NotificationConfig, ServiceConfig};
pub use controller::SessionController;
pub use engine::{AnchorEngine, EngineError, EngineFactory, StartOptions};
pub use error::{
    ENGINE_START_FALLBACK, MISSING_CREDENTIALS, PROVISION_FALLBACK, Result, SessionError,
};
pub use host::{DEFAULT_QUEUE_DEPTH, ServiceHandle, ServiceHost};
pub use logging::init_logging;
pub use notification::{
    Notification, NotificationChannel, NotificationError, NotificationPresenter, TracingPresenter,
    present,
};
pub use session::{SessionEvent, SessionState, SessionStatus, TeardownReason};
#[cfg(unix)]
pub use tunnel::FdTunnelHandle;
pub use tunnel::{
    DEFAULT_MTU, ProvisionError, RawTunFd, TunnelDescriptor, TunnelHandle, TunnelProvisioner,
    TunnelSpec,
};
