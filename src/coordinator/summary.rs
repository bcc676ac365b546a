//! Package summary updater for one 17track account

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use super::scheduler::{DataUpdater, UpdateCoordinator};
use crate::models::{AccountOptions, StatusSummary};
use crate::seventeentrack::{SeventeenTrackError, TrackingApi};

pub type SummaryCoordinator = UpdateCoordinator<SummaryUpdater>;

/// Status label -> summary key: lower-case, every space replaced by `_`.
///
/// "Ready to be Picked Up" -> "ready_to_be_picked_up"
pub fn normalize_status(label: &str) -> String {
    label.to_lowercase().replace(' ', "_")
}

/// Normalize every label of a remote summary.
///
/// Labels that collapse onto the same key have their counts added (saturating)
/// rather than the last one seen replacing the others, so the result does not
/// depend on map iteration order.
pub fn normalize_summary<I>(summary: I) -> StatusSummary
where
    I: IntoIterator<Item = (String, i64)>,
{
    let mut data = StatusSummary::new();
    for (status, quantity) in summary {
        let count = data.entry(normalize_status(&status)).or_insert(0);
        *count = count.saturating_add(quantity);
    }
    data
}

pub struct SummaryUpdater {
    client: Arc<dyn TrackingApi>,
    options: watch::Receiver<AccountOptions>,
}

impl SummaryUpdater {
    /// `options` is read on every poll, so preference changes apply without a restart
    pub fn new(client: Arc<dyn TrackingApi>, options: watch::Receiver<AccountOptions>) -> Self {
        Self { client, options }
    }

    pub fn show_archived(&self) -> bool {
        self.options.borrow().show_archived
    }
}

#[async_trait]
impl DataUpdater for SummaryUpdater {
    type Data = StatusSummary;
    type Error = SeventeenTrackError;

    async fn update(&self) -> Result<StatusSummary, SeventeenTrackError> {
        let show_archived = self.show_archived();
        let summary = self.client.summary(show_archived).await?;

        tracing::debug!(
            "[17track] Summary fetched ({} statuses, archived: {})",
            summary.len(),
            show_archived
        );

        Ok(normalize_summary(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seventeentrack::fake::FakeTrackingApi;
    use std::time::Duration;

    fn updater(
        options: AccountOptions,
    ) -> (
        Arc<FakeTrackingApi>,
        watch::Sender<AccountOptions>,
        SummaryCoordinator,
    ) {
        let api = Arc::new(FakeTrackingApi::new());
        let (tx, rx) = watch::channel(options);
        let coordinator = UpdateCoordinator::new(
            "seventeentrack",
            Duration::from_secs(600),
            SummaryUpdater::new(api.clone(), rx),
        );
        (api, tx, coordinator)
    }

    #[test]
    fn test_normalize_status() {
        assert_eq!(normalize_status("In Transit"), "in_transit");
        assert_eq!(normalize_status("Ready to be Picked Up"), "ready_to_be_picked_up");
        assert_eq!(normalize_status("Delivered"), "delivered");
        assert_eq!(normalize_status("Not  Found"), "not__found");
        assert_eq!(normalize_status(""), "");
    }

    #[test]
    fn test_normalize_status_is_idempotent() {
        let labels = [
            "In Transit",
            "Ready to be picked up",
            "NOT FOUND",
            "a_b c",
            "Ünknown Stätus",
        ];
        for label in labels {
            let once = normalize_status(label);
            assert_eq!(normalize_status(&once), once, "label {:?}", label);
        }
    }

    #[test]
    fn test_normalize_summary_sums_collisions() {
        let data = normalize_summary(vec![
            ("In Transit".to_string(), 2),
            ("in transit".to_string(), 1),
            ("Expired".to_string(), 4),
        ]);
        assert_eq!(data.len(), 2);
        assert_eq!(data["in_transit"], 3);
        assert_eq!(data["expired"], 4);
    }

    #[test]
    fn test_normalize_summary_saturates_on_overflow() {
        let data = normalize_summary(vec![
            ("In Transit".to_string(), i64::MAX),
            ("in transit".to_string(), 1),
        ]);
        assert_eq!(data["in_transit"], i64::MAX);
    }

    #[tokio::test]
    async fn test_poll_publishes_normalized_summary() {
        let (api, _tx, coordinator) = updater(AccountOptions::default());
        api.push_summary(&[("In Transit", 3), ("Delivered", 5)]);

        coordinator.refresh().await.unwrap();

        let data = coordinator.data().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data["in_transit"], 3);
        assert_eq!(data["delivered"], 5);
    }

    #[tokio::test]
    async fn test_poll_replaces_previous_summary() {
        let (api, _tx, coordinator) = updater(AccountOptions::default());
        api.push_summary(&[("Delivered", 2)]);
        api.push_summary(&[("Expired", 1)]);

        coordinator.refresh().await.unwrap();
        coordinator.refresh().await.unwrap();

        let data = coordinator.data().unwrap();
        assert!(data.get("delivered").is_none());
        assert_eq!(data["expired"], 1);
    }

    #[tokio::test]
    async fn test_failed_poll_leaves_summary_untouched() {
        let (api, _tx, coordinator) = updater(AccountOptions::default());
        api.push_summary(&[("Delivered", 2)]);
        api.push_failure("timeout");

        coordinator.refresh().await.unwrap();
        let before = coordinator.data().unwrap();

        let err = coordinator.refresh().await.unwrap_err();
        assert!(matches!(err, SeventeenTrackError::Malformed(_)));

        let after = coordinator.data().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert!(!coordinator.last_update_success());
    }

    #[tokio::test]
    async fn test_archived_preference_read_every_poll() {
        let (api, tx, coordinator) = updater(AccountOptions::default());
        api.push_summary(&[]);
        api.push_summary(&[]);

        coordinator.refresh().await.unwrap();
        tx.send_replace(AccountOptions {
            show_archived: true,
            show_delivered: false,
        });
        coordinator.refresh().await.unwrap();

        assert_eq!(*api.summary_calls.lock().unwrap(), vec![false, true]);
    }
}
