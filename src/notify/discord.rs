//! Discord webhook notifications

use chrono::Utc;
use serde::Serialize;

use crate::issues::{Issue, IssueSeverity};

/// Discord notifier
pub struct DiscordNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
    color: u32,
    timestamp: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<DiscordField>,
}

#[derive(Debug, Serialize)]
struct DiscordField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    embeds: Vec<DiscordEmbed>,
}

impl DiscordNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }

    /// Send a Discord notification
    async fn send(&self, embed: DiscordEmbed) {
        let webhook_url = match &self.webhook_url {
            Some(url) => url,
            None => {
                tracing::debug!("Discord webhook URL not configured");
                return;
            }
        };

        let payload = DiscordWebhookPayload {
            embeds: vec![embed],
        };

        match self
            .client
            .post(webhook_url)
            .json(&payload)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
        {
            Ok(response) => {
                if !response.status().is_success() {
                    tracing::warn!("Discord webhook returned status: {}", response.status());
                }
            }
            Err(e) => {
                tracing::error!("Failed to send Discord notification: {}", e);
            }
        }
    }

    /// Convert severity to Discord embed color
    fn severity_to_color(severity: IssueSeverity) -> u32 {
        match severity {
            IssueSeverity::Warning => 0xf39c12, // Orange
        }
    }

    fn issue_embed(issue: &Issue) -> DiscordEmbed {
        let mut fields = vec![
            DiscordField {
                name: "Domain".to_string(),
                value: issue.domain.clone(),
                inline: true,
            },
            DiscordField {
                name: "Severity".to_string(),
                value: format!("{:?}", issue.severity),
                inline: true,
            },
        ];

        if let Some(version) = &issue.breaks_in_version {
            fields.push(DiscordField {
                name: "Breaks In".to_string(),
                value: version.clone(),
                inline: true,
            });
        }

        for (key, value) in &issue.translation_placeholders {
            fields.push(DiscordField {
                name: key.clone(),
                value: value.clone(),
                inline: false,
            });
        }

        DiscordEmbed {
            title: format!("Advisory: {}", issue.issue_id),
            description: format!("Translation key: {}", issue.translation_key),
            color: Self::severity_to_color(issue.severity),
            timestamp: Utc::now().to_rfc3339(),
            fields,
        }
    }

    /// Forward a newly raised advisory
    pub async fn notify_issue(&self, issue: &Issue) {
        self.send(Self::issue_embed(issue)).await;
    }
}
