//! Account config flow
//!
//! `user` creates an entry from credentials posted to the API; `import`
//! converts the legacy static `seventeentrack` config block into an entry and
//! raises a deprecation advisory either way.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;

use crate::config::LegacyPlatformConfig;
use crate::entries::{ConfigEntries, ConfigEntry, EntryError};
use crate::issues::{Issue, IssueRegistry, IssueSeverity};
use crate::models::{AccountCredentials, AccountOptions, EntrySource, DOMAIN, HOST_DOMAIN};
use crate::seventeentrack::{AccountId, ClientFactory, TrackingApi};

/// Version in which the legacy config block stops being imported
pub const LEGACY_IMPORT_BREAKS_IN: &str = "2024.10.0";

const INTEGRATION_TITLE: &str = "17Track";
const ADD_INTEGRATION_URL: &str = "/config/integrations/dashboard/add?domain=seventeentrack";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    AlreadyConfigured,
    InvalidAuth,
    CannotConnect,
}

impl AbortReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbortReason::AlreadyConfigured => "already_configured",
            AbortReason::InvalidAuth => "invalid_auth",
            AbortReason::CannotConnect => "cannot_connect",
        }
    }
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum FlowResult {
    CreateEntry(ConfigEntry),
    Abort(AbortReason),
}

/// Sign in with the given credentials and return the account id
pub async fn validate_login(
    client: &dyn TrackingApi,
    credentials: &AccountCredentials,
) -> Result<AccountId, AbortReason> {
    match client
        .login(&credentials.username, &credentials.password)
        .await
    {
        Ok(Some(account_id)) => Ok(account_id),
        Ok(None) => Err(AbortReason::InvalidAuth),
        Err(e) => {
            tracing::warn!("[17track] Login check for {} failed: {}", credentials.username, e);
            Err(AbortReason::CannotConnect)
        }
    }
}

async fn create_entry(
    entries: &ConfigEntries,
    client_factory: &ClientFactory,
    credentials: AccountCredentials,
    options: AccountOptions,
    source: EntrySource,
) -> Result<FlowResult, EntryError> {
    let client = match client_factory() {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("[17track] Could not build API client: {}", e);
            return Ok(FlowResult::Abort(AbortReason::CannotConnect));
        }
    };

    let account_id = match validate_login(client.as_ref(), &credentials).await {
        Ok(id) => id,
        Err(reason) => return Ok(FlowResult::Abort(reason)),
    };

    if entries.find_by_unique_id(&account_id).await.is_some() {
        return Ok(FlowResult::Abort(AbortReason::AlreadyConfigured));
    }

    let entry = ConfigEntry::new(account_id, credentials, options, source);
    match entries.add(entry.clone()).await {
        Ok(()) => {
            tracing::info!(
                "Created {} entry {} for account {}",
                source,
                entry.entry_id,
                entry.unique_id
            );
            Ok(FlowResult::CreateEntry(entry))
        }
        Err(EntryError::AlreadyConfigured(_)) => {
            Ok(FlowResult::Abort(AbortReason::AlreadyConfigured))
        }
        Err(e) => Err(e),
    }
}

pub async fn step_user(
    entries: &ConfigEntries,
    client_factory: &ClientFactory,
    credentials: AccountCredentials,
    options: AccountOptions,
) -> Result<FlowResult, EntryError> {
    create_entry(entries, client_factory, credentials, options, EntrySource::User).await
}

pub async fn step_import(
    entries: &ConfigEntries,
    client_factory: &ClientFactory,
    legacy: &LegacyPlatformConfig,
) -> Result<FlowResult, EntryError> {
    let credentials = AccountCredentials {
        username: legacy.username.clone(),
        password: legacy.password.clone(),
    };
    let options = AccountOptions {
        show_archived: legacy.show_archived,
        show_delivered: legacy.show_delivered,
    };

    create_entry(entries, client_factory, credentials, options, EntrySource::Import).await
}

/// Deprecation advisory for an import outcome
pub fn import_issue(result: &FlowResult) -> Issue {
    let reason = match result {
        FlowResult::CreateEntry(_) | FlowResult::Abort(AbortReason::AlreadyConfigured) => None,
        FlowResult::Abort(reason) => Some(*reason),
    };

    let mut placeholders = BTreeMap::new();

    match reason {
        None => {
            placeholders.insert("domain".to_string(), DOMAIN.to_string());
            placeholders.insert("integration_title".to_string(), INTEGRATION_TITLE.to_string());
            Issue {
                domain: HOST_DOMAIN.to_string(),
                issue_id: format!("deprecated_yaml_{}", DOMAIN),
                issue_domain: None,
                severity: IssueSeverity::Warning,
                is_fixable: false,
                breaks_in_version: Some(LEGACY_IMPORT_BREAKS_IN.to_string()),
                translation_key: "deprecated_yaml".to_string(),
                translation_placeholders: placeholders,
                created_at: Utc::now(),
            }
        }
        Some(reason) => {
            placeholders.insert("url".to_string(), ADD_INTEGRATION_URL.to_string());
            let issue_id = format!("deprecated_yaml_import_issue_{}", reason);
            Issue {
                domain: DOMAIN.to_string(),
                issue_id: issue_id.clone(),
                issue_domain: Some(DOMAIN.to_string()),
                severity: IssueSeverity::Warning,
                is_fixable: false,
                breaks_in_version: Some(LEGACY_IMPORT_BREAKS_IN.to_string()),
                translation_key: issue_id,
                translation_placeholders: placeholders,
                created_at: Utc::now(),
            }
        }
    }
}

/// Run the import step for a legacy config block and raise the advisory
pub async fn import_legacy_config(
    entries: &ConfigEntries,
    issues: &IssueRegistry,
    client_factory: &ClientFactory,
    legacy: &LegacyPlatformConfig,
) -> Result<FlowResult, EntryError> {
    let result = step_import(entries, client_factory, legacy).await?;

    if let FlowResult::Abort(reason) = &result {
        tracing::warn!("Legacy config import for {} aborted: {}", legacy.username, reason);
    }

    issues.create_issue(import_issue(&result)).await;
    Ok(result)
}
