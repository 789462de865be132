//! Tunnel interface provisioning
//!
//! The OS VPN subsystem turns a [`TunnelSpec`] into a live interface and
//! hands back a [`TunnelDescriptor`]. The descriptor is owned by the session
//! and closed exactly once, either explicitly on teardown or on drop.
//!
//! # Parameters
//!
//! | Field | Value for a VeilNet session |
//! |-------|-----------------------------|
//! | session | configured session name ("VeilNet") |
//! | address | engine `cidr` |
//! | dns | gateway address from engine `gateway_cidr` |
//! | routes | `0.0.0.0/0` |
//! | mtu | 1500 |
//! | disallowed apps | the hosting application itself |

use crate::cidr::Cidr;
use serde::Serialize;
use std::io;
use std::net::Ipv4Addr;
use tracing::{debug, warn};

/// Raw descriptor number handed to the engine
pub type RawTunFd = i32;

/// Default tunnel MTU
pub const DEFAULT_MTU: u16 = 1500;

/// Parameters for establishing the tunnel interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TunnelSpec {
    /// Session label shown by the OS
    pub session: String,
    /// Local interface addresses
    pub addresses: Vec<Cidr>,
    /// DNS servers reachable through the tunnel
    pub dns_servers: Vec<Ipv4Addr>,
    /// Routes captured by the tunnel
    pub routes: Vec<Cidr>,
    /// Interface MTU
    pub mtu: u16,
    /// Applications whose traffic bypasses the tunnel
    pub disallowed_applications: Vec<String>,
}

impl TunnelSpec {
    /// Start a spec for the named session
    pub fn new(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            addresses: Vec::new(),
            dns_servers: Vec::new(),
            routes: Vec::new(),
            mtu: DEFAULT_MTU,
            disallowed_applications: Vec::new(),
        }
    }

    pub fn address(mut self, cidr: Cidr) -> Self {
        self.addresses.push(cidr);
        self
    }

    pub fn dns_server(mut self, server: Ipv4Addr) -> Self {
        self.dns_servers.push(server);
        self
    }

    pub fn route(mut self, route: Cidr) -> Self {
        self.routes.push(route);
        self
    }

    pub fn mtu(mut self, mtu: u16) -> Self {
        self.mtu = mtu;
        self
    }

    pub fn disallow_application(mut self, app: impl Into<String>) -> Self {
        self.disallowed_applications.push(app.into());
        self
    }

    /// Check if all traffic is routed through the tunnel
    pub fn captures_all_traffic(&self) -> bool {
        self.routes.iter().any(Cidr::is_default_route)
    }
}

/// Provisioning failure. The message may be absent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .message.as_deref().unwrap_or("tunnel provisioning failed"))]
pub struct ProvisionError {
    message: Option<String>,
}

impl ProvisionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    pub fn without_message() -> Self {
        Self { message: None }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl From<io::Error> for ProvisionError {
    fn from(err: io::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// OS VPN subsystem
pub trait TunnelProvisioner: Send + Sync {
    /// Establish the interface described by `spec`
    fn establish(&self, spec: &TunnelSpec) -> Result<TunnelDescriptor, ProvisionError>;
}

/// Platform handle behind a [`TunnelDescriptor`]
pub trait TunnelHandle: Send + Sync {
    /// Descriptor number passed to the engine
    fn raw_fd(&self) -> RawTunFd;

    /// Release the OS handle
    fn close(&mut self) -> io::Result<()>;
}

/// Owned handle to an established tunnel interface
pub struct TunnelDescriptor {
    handle: Box<dyn TunnelHandle>,
    fd: RawTunFd,
    closed: bool,
}

impl TunnelDescriptor {
    pub fn new(handle: Box<dyn TunnelHandle>) -> Self {
        let fd = handle.raw_fd();
        Self {
            handle,
            fd,
            closed: false,
        }
    }

    /// Descriptor number as seen when the interface was established
    pub fn raw_fd(&self) -> RawTunFd {
        self.fd
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the interface. Later calls are no-ops.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("Closing tunnel descriptor {}", self.fd);
        self.handle.close()
    }
}

impl std::fmt::Debug for TunnelDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelDescriptor")
            .field("fd", &self.fd)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Drop for TunnelDescriptor {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close tunnel descriptor {}: {}", self.fd, e);
        }
    }
}

/// Handle backed by an owned unix file descriptor
#[cfg(unix)]
pub struct FdTunnelHandle {
    fd: Option<std::os::fd::OwnedFd>,
    raw: RawTunFd,
}

#[cfg(unix)]
impl FdTunnelHandle {
    pub fn new(fd: std::os::fd::OwnedFd) -> Self {
        use std::os::fd::AsRawFd;

        let raw = fd.as_raw_fd();
        Self { fd: Some(fd), raw }
    }
}

#[cfg(unix)]
impl TunnelHandle for FdTunnelHandle {
    fn raw_fd(&self) -> RawTunFd {
        self.raw
    }

    fn close(&mut self) -> io::Result<()> {
        // OwnedFd closes on drop
        drop(self.fd.take());
        Ok(())
    }
}

#[cfg(unix)]
impl From<std::os::fd::OwnedFd> for TunnelDescriptor {
    fn from(fd: std::os::fd::OwnedFd) -> Self {
        TunnelDescriptor::new(Box::new(FdTunnelHandle::new(fd)))
    }
}
