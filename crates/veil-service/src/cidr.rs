//! CIDR parsing
//!
//! The engine hands back its tunnel addressing as two `address/prefix`
//! strings. They are split on `/`; the first two parts must parse and any
//! further parts are ignored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Largest IPv4 prefix length
pub const MAX_PREFIX_LEN: u8 = 32;

/// IPv4 network in `address/prefix` notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cidr {
    /// Address part
    pub addr: Ipv4Addr,
    /// Prefix length (0..=32)
    pub prefix_len: u8,
}

impl Cidr {
    /// Create a CIDR, checking the prefix length
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Result<Self, CidrError> {
        if prefix_len > MAX_PREFIX_LEN {
            return Err(CidrError::PrefixOutOfRange(prefix_len));
        }
        Ok(Self { addr, prefix_len })
    }

    /// The catch-all route `0.0.0.0/0`
    pub const fn default_route() -> Self {
        Self {
            addr: Ipv4Addr::UNSPECIFIED,
            prefix_len: 0,
        }
    }

    /// Check if this is the catch-all route
    pub fn is_default_route(&self) -> bool {
        self.prefix_len == 0
    }
}

impl FromStr for Cidr {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('/');
        let addr = parts.next().unwrap_or_default();
        let prefix = parts
            .next()
            .ok_or_else(|| CidrError::MissingSeparator(s.to_string()))?;

        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| CidrError::InvalidAddress(addr.to_string()))?;
        let prefix_len: u8 = prefix
            .parse()
            .map_err(|_| CidrError::InvalidPrefix(prefix.to_string()))?;

        Self::new(addr, prefix_len)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl TryFrom<String> for Cidr {
    type Error = CidrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cidr> for String {
    fn from(cidr: Cidr) -> Self {
        cidr.to_string()
    }
}

/// Tunnel addressing produced by a started engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TunnelConfig {
    /// Local interface address
    pub address: Ipv4Addr,
    /// Local prefix length
    pub prefix_len: u8,
    /// Gateway address (also used as the tunnel DNS server)
    pub gateway: Ipv4Addr,
    /// Gateway prefix length
    pub gateway_prefix_len: u8,
}

impl TunnelConfig {
    /// Parse the engine's `cidr` and `gateway_cidr` strings
    pub fn from_cidrs(cidr: &str, gateway_cidr: &str) -> Result<Self, CidrError> {
        let local: Cidr = cidr.parse()?;
        let gateway: Cidr = gateway_cidr.parse()?;

        Ok(Self {
            address: local.addr,
            prefix_len: local.prefix_len,
            gateway: gateway.addr,
            gateway_prefix_len: gateway.prefix_len,
        })
    }

    /// Local address as a CIDR
    pub fn local(&self) -> Cidr {
        Cidr {
            addr: self.address,
            prefix_len: self.prefix_len,
        }
    }
}

impl fmt::Display for TunnelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} via {}/{}",
            self.address, self.prefix_len, self.gateway, self.gateway_prefix_len
        )
    }
}

/// CIDR parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CidrError {
    #[error("Malformed CIDR (missing '/'): {0}")]
    MissingSeparator(String),

    #[error("Invalid IPv4 address: {0}")]
    InvalidAddress(String),

    #[error("Invalid prefix length: {0}")]
    InvalidPrefix(String),

    #[error("Prefix length out of range: {0}")]
    PrefixOutOfRange(u8),
}
