//! Entry lifecycle - setup, teardown and live option changes
//!
//! Each loaded entry owns a summary coordinator, its poll task and the seven
//! sensors reading from it. Dropping the runtime stops the poll task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use crate::config::LegacyPlatformConfig;
use crate::coordinator::{SummaryCoordinator, SummaryUpdater, UpdateCoordinator};
use crate::entries::{ConfigEntries, ConfigEntry, EntryError, EntryView};
use crate::error::SetupError;
use crate::flow::{self, FlowResult};
use crate::issues::IssueRegistry;
use crate::models::{AccountCredentials, AccountOptions, SensorState, DOMAIN};
use crate::sensor::SummarySensor;
use crate::seventeentrack::ClientFactory;

struct EntryRuntime {
    coordinator: Arc<SummaryCoordinator>,
    sensors: Vec<SummarySensor>,
    options: watch::Sender<AccountOptions>,
    poll_task: JoinHandle<()>,
}

impl Drop for EntryRuntime {
    fn drop(&mut self) {
        self.poll_task.abort();
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub entries: Arc<ConfigEntries>,
    pub issues: Arc<IssueRegistry>,
    client_factory: ClientFactory,
    scan_interval: Duration,
    runtimes: Arc<RwLock<HashMap<String, EntryRuntime>>>,
    start_time: Instant,
}

impl AppState {
    pub fn new(
        entries: Arc<ConfigEntries>,
        issues: Arc<IssueRegistry>,
        client_factory: ClientFactory,
        scan_interval: Duration,
    ) -> Self {
        Self {
            entries,
            issues,
            client_factory,
            scan_interval,
            runtimes: Arc::new(RwLock::new(HashMap::new())),
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Sign in, fetch the first summary, create the sensors and start polling
    pub async fn setup_entry(&self, entry: &ConfigEntry) -> Result<(), SetupError> {
        let client = (self.client_factory)().map_err(|e| SetupError::NotReady(e.to_string()))?;

        match client
            .login(&entry.data.username, &entry.data.password)
            .await
        {
            Ok(Some(account_id)) => {
                if account_id != entry.unique_id {
                    tracing::warn!(
                        "Entry {} signed in as account {}, expected {}",
                        entry.entry_id,
                        account_id,
                        entry.unique_id
                    );
                }
            }
            Ok(None) => return Err(SetupError::AuthFailed(entry.data.username.clone())),
            Err(e) => return Err(SetupError::NotReady(e.to_string())),
        }

        let (options_tx, options_rx) = watch::channel(entry.options);
        let coordinator = Arc::new(UpdateCoordinator::new(
            format!("{}:{}", DOMAIN, entry.title),
            self.scan_interval,
            SummaryUpdater::new(client, options_rx),
        ));

        coordinator.first_refresh().await?;

        let sensors = SummarySensor::for_account(&entry.unique_id, &coordinator);
        let poll_task = coordinator.spawn();

        let runtime = EntryRuntime {
            coordinator,
            sensors,
            options: options_tx,
            poll_task,
        };

        // Replacing a previous runtime drops it, which stops its poll task
        self.runtimes
            .write()
            .await
            .insert(entry.entry_id.clone(), runtime);

        tracing::info!("Entry {} ({}) set up", entry.entry_id, entry.title);
        Ok(())
    }

    /// Set up every stored entry; failures are logged and the entry stays unloaded
    pub async fn setup_all(&self) -> usize {
        let entries = self.entries.list().await;
        let results =
            futures::future::join_all(entries.iter().map(|e| self.setup_entry(e))).await;

        let mut loaded = 0;
        for (entry, result) in entries.iter().zip(results) {
            match result {
                Ok(()) => loaded += 1,
                Err(e) => tracing::warn!(
                    "Entry {} ({}) not loaded: {}",
                    entry.entry_id,
                    entry.title,
                    e
                ),
            }
        }
        loaded
    }

    /// Reload a stored entry, e.g. after it failed to set up
    pub async fn reload_entry(&self, entry_id: &str) -> Result<(), SetupError> {
        let entry = self
            .entries
            .get(entry_id)
            .await
            .ok_or_else(|| SetupError::EntryNotFound(entry_id.to_string()))?;

        self.unload_entry(entry_id).await;
        self.setup_entry(&entry).await
    }

    /// Stop polling and drop the sensors. Returns false if the entry was not loaded.
    pub async fn unload_entry(&self, entry_id: &str) -> bool {
        let removed = self.runtimes.write().await.remove(entry_id);
        if removed.is_some() {
            tracing::info!("Entry {} unloaded", entry_id);
        }
        removed.is_some()
    }

    pub async fn remove_entry(&self, entry_id: &str) -> Result<Option<ConfigEntry>, EntryError> {
        self.unload_entry(entry_id).await;
        self.entries.remove(entry_id).await
    }

    /// Persist new options and hand them to the running updater; the next poll uses them
    pub async fn update_options(
        &self,
        entry_id: &str,
        options: AccountOptions,
    ) -> Result<Option<ConfigEntry>, EntryError> {
        let updated = self.entries.update_options(entry_id, options).await?;

        if updated.is_some() {
            if let Some(runtime) = self.runtimes.read().await.get(entry_id) {
                runtime.options.send_replace(options);
            }
        }

        Ok(updated)
    }

    /// Run the user flow and load the new entry
    pub async fn create_entry(
        &self,
        credentials: AccountCredentials,
        options: AccountOptions,
    ) -> Result<FlowResult, EntryError> {
        let result =
            flow::step_user(&self.entries, &self.client_factory, credentials, options).await?;
        self.setup_created(&result).await;
        Ok(result)
    }

    /// Import the legacy config block, raise the advisory, and load the entry if one was created
    pub async fn import_legacy(
        &self,
        legacy: &LegacyPlatformConfig,
    ) -> Result<FlowResult, EntryError> {
        let result =
            flow::import_legacy_config(&self.entries, &self.issues, &self.client_factory, legacy)
                .await?;
        self.setup_created(&result).await;
        Ok(result)
    }

    async fn setup_created(&self, result: &FlowResult) {
        if let FlowResult::CreateEntry(entry) = result {
            if let Err(e) = self.setup_entry(entry).await {
                tracing::warn!("New entry {} not loaded yet: {}", entry.entry_id, e);
            }
        }
    }

    /// API view of an entry, with poll status when it is loaded
    pub async fn entry_view(&self, entry: &ConfigEntry) -> EntryView {
        let mut view = EntryView::new(entry);
        if let Some(coordinator) = self.coordinator(&entry.entry_id).await {
            let state = coordinator.state();
            view.loaded = true;
            view.last_update_success = Some(state.last_update_success);
            view.last_updated = state.last_updated;
            view.last_error = state.last_error;
        }
        view
    }

    pub async fn coordinator(&self, entry_id: &str) -> Option<Arc<SummaryCoordinator>> {
        self.runtimes
            .read()
            .await
            .get(entry_id)
            .map(|r| r.coordinator.clone())
    }

    pub async fn sensor_states(&self) -> Vec<SensorState> {
        let runtimes = self.runtimes.read().await;
        let mut states: Vec<SensorState> = runtimes
            .values()
            .flat_map(|r| r.sensors.iter().map(|s| s.state()))
            .collect();
        states.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));
        states
    }

    pub async fn sensor_state(&self, unique_id: &str) -> Option<SensorState> {
        self.runtimes
            .read()
            .await
            .values()
            .flat_map(|r| r.sensors.iter())
            .find(|s| s.unique_id() == unique_id)
            .map(|s| s.state())
    }

    /// Stop all poll tasks
    pub async fn shutdown(&self) {
        let count = {
            let mut runtimes = self.runtimes.write().await;
            let count = runtimes.len();
            runtimes.clear();
            count
        };
        tracing::info!("Unloaded {} entries", count);
    }
}
