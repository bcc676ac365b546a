//! 17track.net HTTP JSON API client
//!
//! Sign-in goes to the user API and sets a session cookie; the package
//! summary is read from the buyer API with that cookie.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use url::Url;

use super::{status_label, AccountId, SeventeenTrackError, TrackingApi};
use crate::config::ApiConfig;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(rename = "Code")]
    code: i64,
    #[serde(rename = "Json")]
    json: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SigninResult {
    gid: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct IndexData {
    eitem: Vec<StatusItem>,
}

#[derive(Debug, Deserialize)]
struct StatusItem {
    e: i64,
    ec: i64,
}

// ============================================================================
// Client
// ============================================================================

pub struct SeventeenTrackClient {
    user_url: Url,
    buyer_url: Url,
    http_client: Client,
}

impl SeventeenTrackClient {
    pub fn new(config: &ApiConfig) -> Result<Self, SeventeenTrackError> {
        let http_client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            user_url: Url::parse(&config.user_url)?,
            buyer_url: Url::parse(&config.buyer_url)?,
            http_client,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        url: &Url,
        method: &str,
        param: Value,
    ) -> Result<ApiResponse<T>, SeventeenTrackError> {
        let body = serde_json::json!({
            "version": "1.0",
            "method": method,
            "param": param,
            "sourcetype": 0
        });

        let resp = self
            .http_client
            .post(url.clone())
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SeventeenTrackError::Http(resp.status()));
        }

        let text = resp.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| SeventeenTrackError::Malformed(format!("{} response: {}", method, e)))
    }
}

#[async_trait]
impl TrackingApi for SeventeenTrackClient {
    async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<AccountId>, SeventeenTrackError> {
        let param = serde_json::json!({
            "Email": email,
            "Password": password,
            "CaptchaCode": ""
        });

        let resp: ApiResponse<SigninResult> = self.call(&self.user_url, "Signin", param).await?;
        let account_id = parse_signin(resp)?;

        match &account_id {
            Some(id) => tracing::info!("[17track] Signed in as account {}", id),
            None => tracing::warn!("[17track] Sign-in rejected for {}", email),
        }

        Ok(account_id)
    }

    async fn summary(
        &self,
        show_archived: bool,
    ) -> Result<HashMap<String, i64>, SeventeenTrackError> {
        let param = serde_json::json!({ "IsArchived": show_archived });

        let resp: ApiResponse<IndexData> =
            self.call(&self.buyer_url, "GetIndexData", param).await?;
        parse_summary(resp)
    }
}

// ============================================================================
// Response parsing
// ============================================================================

fn parse_signin(resp: ApiResponse<SigninResult>) -> Result<Option<AccountId>, SeventeenTrackError> {
    if resp.code != 0 {
        return Ok(None);
    }

    let gid = resp
        .json
        .and_then(|j| j.gid)
        .ok_or_else(|| SeventeenTrackError::Malformed("Signin: no gid in response".to_string()))?;

    let account_id = match gid {
        Value::String(s) if !s.is_empty() => s,
        Value::Number(n) => n.to_string(),
        other => {
            return Err(SeventeenTrackError::Malformed(format!(
                "Signin: unexpected gid {}",
                other
            )))
        }
    };

    Ok(Some(account_id))
}

fn parse_summary(
    resp: ApiResponse<IndexData>,
) -> Result<HashMap<String, i64>, SeventeenTrackError> {
    if resp.code != 0 {
        return Err(SeventeenTrackError::Api(resp.code));
    }

    let data = resp.json.ok_or_else(|| {
        SeventeenTrackError::Malformed("GetIndexData: no Json in response".to_string())
    })?;

    let mut results: HashMap<String, i64> = HashMap::new();
    for item in data.eitem {
        let label = status_label(item.e);
        let count = results.entry(label.to_string()).or_insert(0);
        *count = count.checked_add(item.ec).ok_or_else(|| {
            SeventeenTrackError::Malformed(format!("GetIndexData: count overflow for {}", label))
        })?;
    }

    Ok(results)
}
