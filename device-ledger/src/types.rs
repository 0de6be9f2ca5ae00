//! Core types for the ledger
//!
//! Field names on the wire (`ID`, `Status`, `docType`) are fixed; stored
//! values are always written through [`crate::canonical`].

use crate::{canonical, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status value that bars a device from authenticating
pub const BLACKLISTED_STATUS: &str = "Inactive";

/// `docType` written on records created by ledger initialization
pub const DOC_TYPE_DEVICE: &str = "device";

/// Key under which the initialization placeholder is stored
pub const PLACEHOLDER_KEY: &str = "";

/// Device record, the only entity in the world state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Device ID (ledger key). Null only on the initialization placeholder.
    #[serde(rename = "ID")]
    pub id: Option<String>,

    /// Free-form status
    #[serde(rename = "Status")]
    pub status: Option<String>,

    /// Record type marker, present on initialization records only
    #[serde(rename = "docType", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
}

impl DeviceRecord {
    /// Record written by register and update
    pub fn new(id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            status: Some(status.into()),
            doc_type: None,
        }
    }

    /// Record written by ledger initialization
    pub fn placeholder() -> Self {
        Self {
            id: None,
            status: None,
            doc_type: Some(DOC_TYPE_DEVICE.to_string()),
        }
    }

    /// True when the status is exactly `Inactive`
    pub fn is_blacklisted(&self) -> bool {
        self.status.as_deref() == Some(BLACKLISTED_STATUS)
    }

    /// Canonical encoding
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>> {
        canonical::to_canonical_vec(self)
    }

    /// Decode from stored bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({})",
            self.id.as_deref().unwrap_or("<placeholder>"),
            self.status.as_deref().unwrap_or("-")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_encoding() {
        let record = DeviceRecord::new("D1", "Active");
        let bytes = record.to_canonical_bytes().unwrap();
        assert_eq!(bytes, br#"{"ID":"D1","Status":"Active"}"#);
    }

    #[test]
    fn test_placeholder_encoding() {
        let bytes = DeviceRecord::placeholder().to_canonical_bytes().unwrap();
        assert_eq!(bytes, br#"{"ID":null,"Status":null,"docType":"device"}"#);
    }

    #[test]
    fn test_decode_round_trip() {
        let record = DeviceRecord::placeholder();
        let decoded = DeviceRecord::from_slice(&record.to_canonical_bytes().unwrap()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_blacklisted() {
        assert!(DeviceRecord::new("D1", "Inactive").is_blacklisted());
        assert!(!DeviceRecord::new("D1", "inactive").is_blacklisted());
        assert!(!DeviceRecord::new("D1", "Active").is_blacklisted());
        assert!(!DeviceRecord::placeholder().is_blacklisted());
    }
}
