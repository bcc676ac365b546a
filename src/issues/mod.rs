//! User-visible advisories (deprecations, import failures)

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::notify::DiscordNotifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Warning,
}

#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    /// Domain the issue is filed under
    pub domain: String,
    pub issue_id: String,
    /// Integration the issue is about, when filed under another domain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_domain: Option<String>,
    pub severity: IssueSeverity,
    pub is_fixable: bool,
    pub breaks_in_version: Option<String>,
    pub translation_key: String,
    pub translation_placeholders: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

pub struct IssueRegistry {
    issues: RwLock<Vec<Issue>>,
    notifier: Option<Arc<DiscordNotifier>>,
}

impl IssueRegistry {
    pub fn new(notifier: Option<Arc<DiscordNotifier>>) -> Self {
        Self {
            issues: RwLock::new(Vec::new()),
            notifier,
        }
    }

    /// Raise an issue. An issue with the same `(domain, issue_id)` is replaced
    /// in place and not re-notified. Returns true when the issue is new.
    pub async fn create_issue(&self, issue: Issue) -> bool {
        let is_new = {
            let mut issues = self.issues.write().await;
            match issues
                .iter_mut()
                .find(|i| i.domain == issue.domain && i.issue_id == issue.issue_id)
            {
                Some(existing) => {
                    *existing = issue.clone();
                    false
                }
                None => {
                    issues.push(issue.clone());
                    true
                }
            }
        };

        if is_new {
            tracing::warn!(
                "Issue raised: {}.{} ({:?}, breaks in {})",
                issue.domain,
                issue.issue_id,
                issue.severity,
                issue.breaks_in_version.as_deref().unwrap_or("n/a")
            );

            if let Some(notifier) = &self.notifier {
                notifier.notify_issue(&issue).await;
            }
        }

        is_new
    }

    pub async fn list(&self) -> Vec<Issue> {
        self.issues.read().await.clone()
    }

    pub async fn get(&self, domain: &str, issue_id: &str) -> Option<Issue> {
        self.issues
            .read()
            .await
            .iter()
            .find(|i| i.domain == domain && i.issue_id == issue_id)
            .cloned()
    }
}
