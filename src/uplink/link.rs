//! # Network Link
//!
//! Binary link state plus a reconnect primitive. On the device this is the
//! wireless association; on a host it is a TCP reachability probe against
//! the ingestion endpoint.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{NodeError, Result};

/// Link state as seen by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Up,
    Down,
}

/// Network link that can report its state and try to re-establish itself
#[cfg_attr(test, mockall::automock)]
pub trait Link: Send {
    /// Whether the link is currently usable
    fn is_up(&self) -> bool;

    /// Attempts to bring the link up, returning whether it is up afterwards
    fn reconnect(&mut self) -> bool;

    /// Records that the link was observed to be unusable
    fn mark_down(&mut self);
}

/// Link considered up while the endpoint accepts TCP connections.
#[derive(Debug, Clone)]
pub struct TcpProbeLink {
    authority: String,
    timeout: Duration,
    up: bool,
}

impl TcpProbeLink {
    /// Creates a probe for the host and port of `endpoint`.
    ///
    /// The link starts down; the first [`Link::reconnect`] establishes it.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            authority: authority_of(endpoint)?,
            timeout,
            up: false,
        })
    }

    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = self
            .authority
            .to_socket_addrs()
            .map_err(|e| NodeError::Link(format!("Failed to resolve {}: {}", self.authority, e)))?
            .collect();
        if addrs.is_empty() {
            return Err(NodeError::Link(format!("No addresses for {}", self.authority)));
        }
        Ok(addrs)
    }

    fn probe(&self) -> Result<()> {
        let mut last_error = None;
        for addr in self.resolve()? {
            debug!("Probing {}", addr);
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(_) => return Ok(()),
                Err(e) => last_error = Some(e),
            }
        }
        Err(NodeError::Link(format!(
            "{} unreachable: {}",
            self.authority,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

impl Link for TcpProbeLink {
    fn is_up(&self) -> bool {
        self.up
    }

    fn reconnect(&mut self) -> bool {
        match self.probe() {
            Ok(()) => {
                info!("Link up: {} reachable", self.authority);
                self.up = true;
            }
            Err(e) => {
                warn!("Link connection failed. Will retry later: {}", e);
                self.up = false;
            }
        }
        self.up
    }

    fn mark_down(&mut self) {
        if self.up {
            info!("Link to {} marked down", self.authority);
        }
        self.up = false;
    }
}

/// Extracts `host:port` from an http(s) URL, applying the scheme's default port.
fn authority_of(endpoint: &str) -> Result<String> {
    let (rest, default_port) = if let Some(rest) = endpoint.strip_prefix("https://") {
        (rest, 443)
    } else if let Some(rest) = endpoint.strip_prefix("http://") {
        (rest, 80)
    } else {
        return Err(NodeError::Link(format!("Unsupported endpoint scheme: {}", endpoint)));
    };

    let authority = rest
        .split(|c| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    // Drop any userinfo
    let authority = authority.rsplit('@').next().unwrap_or_default();

    if authority.is_empty() {
        return Err(NodeError::Link(format!("Endpoint has no host: {}", endpoint)));
    }

    let has_port = match authority.rfind(':') {
        // IPv6 literals contain colons inside brackets
        Some(i) => !authority[i..].contains(']'),
        None => false,
    };

    if has_port {
        Ok(authority.to_string())
    } else {
        Ok(format!("{}:{}", authority, default_port))
    }
}
