//! # Upload Client
//!
//! Makes exactly one delivery attempt per call. Retry policy belongs to the
//! delivery pipeline; a failure here has no side effect beyond the report.

use tracing::{info, warn};

use super::payload::UploadPayload;
use super::transport::{PostRequest, Transport};
use crate::reading::Reading;

/// Outcome of one delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The endpoint returned a response
    Delivered,
    /// No response was obtained (no link, transport error, timeout)
    Failed,
}

impl DeliveryOutcome {
    #[must_use]
    pub fn is_delivered(self) -> bool {
        self == DeliveryOutcome::Delivered
    }
}

/// Single-shot uploader for readings
pub struct UploadClient {
    transport: Box<dyn Transport>,
    url: String,
    device_id: String,
}

impl std::fmt::Debug for UploadClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadClient")
            .field("device_id", &self.device_id)
            .finish_non_exhaustive()
    }
}

impl UploadClient {
    /// # Arguments
    ///
    /// * `transport` - HTTP transport used for every attempt
    /// * `url` - Full endpoint URL including the access credential
    /// * `device_id` - Identifier sent with every payload
    pub fn new(transport: Box<dyn Transport>, url: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
            device_id: device_id.into(),
        }
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Attempts to deliver `reading` once.
    pub fn deliver(&self, reading: &Reading) -> DeliveryOutcome {
        let body = match UploadPayload::new(reading, &self.device_id).to_json() {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to encode upload payload: {}", e);
                return DeliveryOutcome::Failed;
            }
        };

        info!("Uploading data: {}", body);

        match self.transport.post(&PostRequest::json(self.url.as_str(), body)) {
            Ok(response) if response.status > 0 => {
                info!("HTTP Response code: {}", response.status);
                info!("{}", response.body);
                DeliveryOutcome::Delivered
            }
            Ok(response) => {
                warn!("Error on sending POST: status {}", response.status);
                DeliveryOutcome::Failed
            }
            Err(e) => {
                warn!("Error on sending POST: {}", e);
                DeliveryOutcome::Failed
            }
        }
    }
}
