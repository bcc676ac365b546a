//! Interval-driven update coordinator
//!
//! Owns one [`DataUpdater`], calls it on a fixed interval (and on demand), and
//! publishes the latest result in a `watch` cell. The published data is swapped
//! as a whole `Arc`, so readers never see a partially written value.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::error::SetupError;

/// Fetches a fresh value for a coordinator
#[async_trait]
pub trait DataUpdater: Send + Sync + 'static {
    type Data: Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn update(&self) -> Result<Self::Data, Self::Error>;
}

/// Latest published coordinator state
#[derive(Debug)]
pub struct CoordinatorState<T> {
    /// Last successfully fetched value; kept across failed polls
    pub data: Option<Arc<T>>,
    pub last_update_success: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl<T> Clone for CoordinatorState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            last_update_success: self.last_update_success,
            last_updated: self.last_updated,
            last_error: self.last_error.clone(),
        }
    }
}

impl<T> Default for CoordinatorState<T> {
    fn default() -> Self {
        Self {
            data: None,
            last_update_success: true,
            last_updated: None,
            last_error: None,
        }
    }
}

pub struct UpdateCoordinator<U: DataUpdater> {
    name: String,
    update_interval: Duration,
    updater: U,
    state: watch::Sender<CoordinatorState<U::Data>>,
    refresh_lock: Mutex<()>,
}

impl<U: DataUpdater> UpdateCoordinator<U> {
    pub fn new(name: impl Into<String>, update_interval: Duration, updater: U) -> Self {
        let (state, _) = watch::channel(CoordinatorState::default());
        Self {
            name: name.into(),
            update_interval,
            updater,
            state,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Fetch once and publish the result.
    ///
    /// Only one refresh runs at a time; a caller arriving mid-refresh waits and
    /// then performs its own fetch. On failure the previous data stays published
    /// and only availability changes.
    pub async fn refresh(&self) -> Result<(), U::Error> {
        let _guard = self.refresh_lock.lock().await;

        match self.updater.update().await {
            Ok(data) => {
                let recovered = !self.state.borrow().last_update_success;
                self.state.send_modify(|state| {
                    state.data = Some(Arc::new(data));
                    state.last_update_success = true;
                    state.last_updated = Some(Utc::now());
                    state.last_error = None;
                });

                if recovered {
                    tracing::info!("[{}] Fetching data recovered", self.name);
                } else {
                    tracing::debug!("[{}] Data updated", self.name);
                }
                Ok(())
            }
            Err(e) => {
                let was_available = self.state.borrow().last_update_success;
                if was_available {
                    tracing::error!("[{}] Error fetching data: {}", self.name, e);
                } else {
                    tracing::debug!("[{}] Still failing: {}", self.name, e);
                }

                let message = e.to_string();
                self.state.send_modify(|state| {
                    state.last_update_success = false;
                    state.last_error = Some(message);
                });
                Err(e)
            }
        }
    }

    /// Refresh performed during setup; a failure means the entry is not ready
    pub async fn first_refresh(&self) -> Result<(), SetupError> {
        self.refresh()
            .await
            .map_err(|e| SetupError::NotReady(e.to_string()))
    }

    /// Start the polling loop. Abort the returned handle to stop it.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            coordinator.run().await;
        })
    }

    async fn run(&self) {
        tracing::info!(
            "[{}] Starting poll loop (interval: {}s)",
            self.name,
            self.update_interval.as_secs()
        );

        let mut timer = interval(self.update_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately; setup has already refreshed
        timer.tick().await;

        loop {
            timer.tick().await;
            // Failures are logged by refresh() and surfaced as unavailability
            let _ = self.refresh().await;
        }
    }

    pub fn state(&self) -> CoordinatorState<U::Data> {
        self.state.borrow().clone()
    }

    pub fn data(&self) -> Option<Arc<U::Data>> {
        self.state.borrow().data.clone()
    }

    pub fn last_update_success(&self) -> bool {
        self.state.borrow().last_update_success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error("boom: {0}")]
    struct Boom(String);

    #[derive(Default)]
    struct ScriptedUpdater {
        results: std::sync::Mutex<VecDeque<Result<u32, String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedUpdater {
        fn with(results: Vec<Result<u32, String>>) -> Self {
            Self {
                results: std::sync::Mutex::new(results.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DataUpdater for ScriptedUpdater {
        type Data = u32;
        type Error = Boom;

        async fn update(&self) -> Result<u32, Boom> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.results.lock().unwrap().pop_front() {
                Some(Ok(v)) => Ok(v),
                Some(Err(e)) => Err(Boom(e)),
                None => Ok(0),
            }
        }
    }

    fn coordinator(results: Vec<Result<u32, String>>) -> Arc<UpdateCoordinator<ScriptedUpdater>> {
        Arc::new(UpdateCoordinator::new(
            "test",
            Duration::from_millis(20),
            ScriptedUpdater::with(results),
        ))
    }

    #[tokio::test]
    async fn test_initial_state() {
        let c = coordinator(vec![]);
        assert!(c.data().is_none());
        assert!(c.last_update_success());
        assert!(c.state().last_updated.is_none());
    }

    #[tokio::test]
    async fn test_refresh_publishes_data() {
        let c = coordinator(vec![Ok(7)]);
        tokio_test::assert_ok!(c.refresh().await);
        assert_eq!(c.data().as_deref(), Some(&7));
        assert!(c.last_update_success());
        assert!(c.state().last_updated.is_some());
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_data() {
        let c = coordinator(vec![Ok(7), Err("offline".to_string())]);
        c.refresh().await.unwrap();
        let err = c.refresh().await.unwrap_err();
        assert_eq!(err.to_string(), "boom: offline");

        let state = c.state();
        assert_eq!(state.data.as_deref(), Some(&7));
        assert!(!state.last_update_success);
        assert_eq!(state.last_error.as_deref(), Some("boom: offline"));
    }

    #[tokio::test]
    async fn test_recovery_clears_error() {
        let c = coordinator(vec![Err("offline".to_string()), Ok(3)]);
        assert!(c.refresh().await.is_err());
        assert!(c.data().is_none());

        c.refresh().await.unwrap();
        let state = c.state();
        assert!(state.last_update_success);
        assert!(state.last_error.is_none());
        assert_eq!(state.data.as_deref(), Some(&3));
    }

    #[tokio::test]
    async fn test_first_refresh_failure_is_not_ready() {
        let c = coordinator(vec![Err("offline".to_string())]);
        let err = c.first_refresh().await.unwrap_err();
        assert!(matches!(err, SetupError::NotReady(msg) if msg == "boom: offline"));
    }

    #[tokio::test]
    async fn test_spawned_loop_polls_until_aborted() {
        let c = coordinator(vec![]);
        let handle = c.spawn();

        tokio::time::sleep(Duration::from_millis(110)).await;
        handle.abort();
        let _ = handle.await;

        let calls = c.updater.calls.load(Ordering::SeqCst);
        assert!(calls >= 2, "expected at least 2 polls, got {}", calls);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(c.updater.calls.load(Ordering::SeqCst), calls);
    }
}
