//! Data models for the 17track summary sensors

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Integration domain, used for device identifiers and issue ids
pub const DOMAIN: &str = "seventeentrack";

/// Domain the host raises its own advisories under
pub const HOST_DOMAIN: &str = "homeassistant";

pub const ATTRIBUTION: &str = "Data provided by 17track.net";

/// Normalized status key -> package count, replaced wholesale on every poll
pub type StatusSummary = HashMap<String, i64>;

// ============================================================================
// Account Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountOptions {
    #[serde(default)]
    pub show_archived: bool,
    #[serde(default)]
    pub show_delivered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    User,
    Import,
}

impl std::fmt::Display for EntrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntrySource::User => write!(f, "user"),
            EntrySource::Import => write!(f, "import"),
        }
    }
}

// ============================================================================
// Sensor Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceEntryType {
    Service,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<(String, String)>,
    pub entry_type: DeviceEntryType,
}

/// Point-in-time rendering of one summary sensor
#[derive(Debug, Clone, Serialize)]
pub struct SensorState {
    pub unique_id: String,
    pub key: &'static str,
    pub name: &'static str,
    /// `None` is the "unknown" state; always `None` while unavailable
    pub value: Option<i64>,
    pub available: bool,
    pub unit_of_measurement: &'static str,
    pub icon: &'static str,
    pub attribution: &'static str,
    pub device_info: DeviceInfo,
    pub last_updated: Option<DateTime<Utc>>,
}

// ============================================================================
// API Request Models
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub show_archived: bool,
    #[serde(default)]
    pub show_delivered: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOptionsRequest {
    pub show_archived: Option<bool>,
    pub show_delivered: Option<bool>,
}

impl UpdateOptionsRequest {
    pub fn apply(&self, current: AccountOptions) -> AccountOptions {
        AccountOptions {
            show_archived: self.show_archived.unwrap_or(current.show_archived),
            show_delivered: self.show_delivered.unwrap_or(current.show_delivered),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_options_partial() {
        let current = AccountOptions {
            show_archived: false,
            show_delivered: true,
        };
        let req = UpdateOptionsRequest {
            show_archived: Some(true),
            show_delivered: None,
        };
        let updated = req.apply(current);
        assert!(updated.show_archived);
        assert!(updated.show_delivered);
    }
}
