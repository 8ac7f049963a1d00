//! # Network Transport
//!
//! Blocking HTTP POST behind a trait so the pipeline can be exercised
//! without a network.
//!
//! Any HTTP response counts as a transport success, whatever its status
//! code; only failing to obtain a response is an error.

use std::time::Duration;

use crate::error::{NodeError, Result};

/// A single outbound POST
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl PostRequest {
    /// JSON POST to `url`
    pub fn json(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: body.into(),
        }
    }
}

/// Response obtained from the endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Blocking request transport
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send {
    /// Sends `request`, returning the response or a transport error
    fn post(&self, request: &PostRequest) -> Result<TransportResponse>;
}

/// Transport backed by a `ureq` agent
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    /// Creates a transport whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(&format!("watt-node/{}", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn post(&self, request: &PostRequest) -> Result<TransportResponse> {
        let mut call = self.agent.post(&request.url);
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }

        match call.send_string(&request.body) {
            Ok(response) => {
                let status = response.status();
                Ok(TransportResponse {
                    status,
                    body: response.into_string().unwrap_or_default(),
                })
            }
            // An error status is still a response from the endpoint
            Err(ureq::Error::Status(status, response)) => Ok(TransportResponse {
                status,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(e)) => Err(NodeError::Transport(e.to_string())),
        }
    }
}
