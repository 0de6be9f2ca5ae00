// Request and response bodies

use serde::{Deserialize, Serialize};

/// Body accepted by /register, /update, /auth and /delete
///
/// Absent fields default to the empty string; the contract rejects an empty ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceRequest {
    pub esp32id: String,

    #[serde(rename = "Status")]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub ledger_backend: device_ledger::StorageBackend,
    pub state_digest: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
