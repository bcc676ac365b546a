//! 17track.net account API integration
//!
//! - `client`: reqwest-based client for the user (sign-in) and buyer (summary) APIs
//!
//! The rest of the crate talks to the remote service only through [`TrackingApi`],
//! so tests can substitute a scripted fake.

pub mod client;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use client::SeventeenTrackClient;

/// Account id returned by a successful sign-in
pub type AccountId = String;

#[derive(Error, Debug)]
pub enum SeventeenTrackError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode),

    #[error("17track API error code: {0}")]
    Api(i64),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid API url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Remote account operations consumed by the polling adapter and the config flow
#[async_trait]
pub trait TrackingApi: Send + Sync {
    /// Sign in. `Ok(None)` means the service rejected the credentials.
    async fn login(&self, email: &str, password: &str)
        -> Result<Option<AccountId>, SeventeenTrackError>;

    /// Free-text status label -> package count for the signed-in account
    async fn summary(&self, show_archived: bool)
        -> Result<HashMap<String, i64>, SeventeenTrackError>;
}

/// Builds a fresh client per config entry / flow attempt
pub type ClientFactory =
    Arc<dyn Fn() -> Result<Arc<dyn TrackingApi>, SeventeenTrackError> + Send + Sync>;

/// Package status codes used by the buyer API
pub fn status_label(code: i64) -> &'static str {
    match code {
        0 => "Not Found",
        10 => "In Transit",
        20 => "Expired",
        30 => "Ready to be Picked Up",
        35 => "Undelivered",
        40 => "Delivered",
        50 => "Returned",
        _ => "Unknown",
    }
}
