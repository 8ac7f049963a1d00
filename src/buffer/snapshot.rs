//! # Snapshot Format
//!
//! JSON document mirroring the buffer's undelivered readings, oldest first:
//!
//! ```text
//! { "readings": [ { "timestamp": "...", "power_kw": 1.2, "energy_kwh": 0.01 }, ... ] }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reading::Reading;

/// Persisted buffer contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub readings: Vec<Reading>,
}

impl Snapshot {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
