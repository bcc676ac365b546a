//! Package summary sensors
//!
//! One read-only sensor per fixed status category and account. Sensors never
//! write to the summary; they look their key up in whatever the account's
//! coordinator last published.

use std::sync::Arc;

use serde::Serialize;

use crate::coordinator::SummaryCoordinator;
use crate::models::{DeviceEntryType, DeviceInfo, SensorState, ATTRIBUTION, DOMAIN};

pub const UNIT_OF_MEASUREMENT: &str = "packages";
pub const ICON: &str = "mdi:package";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    Delivered,
    Expired,
    InTransit,
    NotFound,
    ReadyToBePickedUp,
    Returned,
    Undelivered,
}

impl SummaryStatus {
    pub const ALL: [SummaryStatus; 7] = [
        SummaryStatus::Delivered,
        SummaryStatus::Expired,
        SummaryStatus::InTransit,
        SummaryStatus::NotFound,
        SummaryStatus::ReadyToBePickedUp,
        SummaryStatus::Returned,
        SummaryStatus::Undelivered,
    ];

    /// Summary key, matching the normalized status label
    pub fn key(self) -> &'static str {
        match self {
            SummaryStatus::Delivered => "delivered",
            SummaryStatus::Expired => "expired",
            SummaryStatus::InTransit => "in_transit",
            SummaryStatus::NotFound => "not_found",
            SummaryStatus::ReadyToBePickedUp => "ready_to_be_picked_up",
            SummaryStatus::Returned => "returned",
            SummaryStatus::Undelivered => "undelivered",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SummaryStatus::Delivered => "Delivered",
            SummaryStatus::Expired => "Expired",
            SummaryStatus::InTransit => "In transit",
            SummaryStatus::NotFound => "Not found",
            SummaryStatus::ReadyToBePickedUp => "Ready to be picked up",
            SummaryStatus::Returned => "Returned",
            SummaryStatus::Undelivered => "Undelivered",
        }
    }
}

pub struct SummarySensor {
    account_id: String,
    status: SummaryStatus,
    unique_id: String,
    coordinator: Arc<SummaryCoordinator>,
}

impl SummarySensor {
    pub fn new(
        account_id: &str,
        status: SummaryStatus,
        coordinator: Arc<SummaryCoordinator>,
    ) -> Self {
        Self {
            account_id: account_id.to_string(),
            status,
            unique_id: format!("{}_{}", account_id, status.key()),
            coordinator,
        }
    }

    /// One sensor per status category for an account
    pub fn for_account(account_id: &str, coordinator: &Arc<SummaryCoordinator>) -> Vec<Self> {
        SummaryStatus::ALL
            .iter()
            .map(|status| Self::new(account_id, *status, coordinator.clone()))
            .collect()
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn status(&self) -> SummaryStatus {
        self.status
    }

    /// Count for this status in the latest summary; `None` when the status is
    /// absent from it or nothing has been fetched yet
    pub fn read_value(&self) -> Option<i64> {
        self.coordinator
            .data()
            .and_then(|summary| summary.get(self.status.key()).copied())
    }

    pub fn available(&self) -> bool {
        self.coordinator.last_update_success()
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            identifiers: vec![(DOMAIN.to_string(), self.account_id.clone())],
            entry_type: DeviceEntryType::Service,
        }
    }

    /// Snapshot for the API. An unavailable sensor reports no value, not the
    /// count from the last successful poll.
    pub fn state(&self) -> SensorState {
        let available = self.available();
        SensorState {
            unique_id: self.unique_id.clone(),
            key: self.status().key(),
            name: self.status().name(),
            value: if available { self.read_value() } else { None },
            available,
            unit_of_measurement: UNIT_OF_MEASUREMENT,
            icon: ICON,
            attribution: ATTRIBUTION,
            device_info: self.device_info(),
            last_updated: self.coordinator.state().last_updated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::summary::normalize_status;
    use crate::coordinator::{SummaryUpdater, UpdateCoordinator};
    use crate::models::AccountOptions;
    use crate::seventeentrack::fake::FakeTrackingApi;
    use std::time::Duration;
    use tokio::sync::watch;

    fn setup() -> (Arc<FakeTrackingApi>, Arc<SummaryCoordinator>, Vec<SummarySensor>) {
        let api = Arc::new(FakeTrackingApi::new());
        let (_tx, rx) = watch::channel(AccountOptions::default());
        let coordinator = Arc::new(UpdateCoordinator::new(
            "seventeentrack",
            Duration::from_secs(600),
            SummaryUpdater::new(api.clone(), rx),
        ));
        let sensors = SummarySensor::for_account("1234567", &coordinator);
        (api, coordinator, sensors)
    }

    fn sensor<'a>(sensors: &'a [SummarySensor], status: SummaryStatus) -> &'a SummarySensor {
        sensors.iter().find(|s| s.status() == status).unwrap()
    }

    #[test]
    fn test_keys_are_normalized_labels() {
        for status in SummaryStatus::ALL {
            assert_eq!(normalize_status(status.key()), status.key());
        }
        assert_eq!(
            normalize_status(crate::seventeentrack::status_label(30)),
            SummaryStatus::ReadyToBePickedUp.key()
        );
    }

    #[tokio::test]
    async fn test_one_sensor_per_status_with_stable_ids() {
        let (_api, _coordinator, sensors) = setup();
        assert_eq!(sensors.len(), 7);
        let ids: Vec<&str> = sensors.iter().map(|s| s.unique_id()).collect();
        assert!(ids.contains(&"1234567_delivered"));
        assert!(ids.contains(&"1234567_ready_to_be_picked_up"));
        assert!(ids.contains(&"1234567_undelivered"));
    }

    #[tokio::test]
    async fn test_unknown_before_first_poll() {
        let (_api, _coordinator, sensors) = setup();
        assert!(sensors.iter().all(|s| s.read_value().is_none()));
    }

    #[tokio::test]
    async fn test_reads_count_or_unknown() {
        let (api, coordinator, sensors) = setup();
        api.push_summary(&[("In Transit", 3), ("Delivered", 5)]);
        coordinator.refresh().await.unwrap();

        assert_eq!(sensor(&sensors, SummaryStatus::InTransit).read_value(), Some(3));
        assert_eq!(sensor(&sensors, SummaryStatus::Delivered).read_value(), Some(5));
        assert_eq!(sensor(&sensors, SummaryStatus::Expired).read_value(), None);
    }

    #[tokio::test]
    async fn test_single_status_leaves_others_unknown() {
        let (api, coordinator, sensors) = setup();
        api.push_summary(&[("Ready to be picked up", 1)]);
        coordinator.refresh().await.unwrap();

        for s in &sensors {
            if s.status() == SummaryStatus::ReadyToBePickedUp {
                assert_eq!(s.read_value(), Some(1));
            } else {
                assert_eq!(s.read_value(), None, "{}", s.unique_id());
            }
        }
    }

    #[tokio::test]
    async fn test_missing_status_is_unknown_not_stale() {
        let (api, coordinator, sensors) = setup();
        api.push_summary(&[("Delivered", 2)]);
        api.push_summary(&[("Expired", 1)]);
        coordinator.refresh().await.unwrap();
        coordinator.refresh().await.unwrap();

        assert_eq!(sensor(&sensors, SummaryStatus::Delivered).read_value(), None);
        assert_eq!(sensor(&sensors, SummaryStatus::Expired).read_value(), Some(1));
    }

    #[tokio::test]
    async fn test_unavailable_after_failed_poll() {
        let (api, coordinator, sensors) = setup();
        api.push_summary(&[("Delivered", 2)]);
        api.push_failure("unauthorized");
        coordinator.refresh().await.unwrap();
        assert!(coordinator.refresh().await.is_err());

        let delivered = sensor(&sensors, SummaryStatus::Delivered);
        assert!(!delivered.available());
        let state = delivered.state();
        assert!(!state.available);
        assert_eq!(state.value, None);
    }

    #[tokio::test]
    async fn test_value_returns_after_recovery() {
        let (api, coordinator, sensors) = setup();
        api.push_failure("timeout");
        api.push_summary(&[("Undelivered", 6)]);
        assert!(coordinator.refresh().await.is_err());
        coordinator.refresh().await.unwrap();

        let state = sensor(&sensors, SummaryStatus::Undelivered).state();
        assert!(state.available);
        assert_eq!(state.value, Some(6));
    }

    #[tokio::test]
    async fn test_state_metadata() {
        let (api, coordinator, sensors) = setup();
        api.push_summary(&[("Returned", 4)]);
        coordinator.refresh().await.unwrap();

        let state = sensor(&sensors, SummaryStatus::Returned).state();
        assert_eq!(state.unique_id, "1234567_returned");
        assert_eq!(state.value, Some(4));
        assert!(state.available);
        assert_eq!(state.unit_of_measurement, "packages");
        assert_eq!(state.icon, "mdi:package");
        assert_eq!(state.attribution, "Data provided by 17track.net");
        assert_eq!(
            state.device_info.identifiers,
            vec![("seventeentrack".to_string(), "1234567".to_string())]
        );
        assert!(state.last_updated.is_some());
    }
}
