//! Local (reqwest + filesystem) implementations of the terrabot collaborator traits.

use std::time::Duration;
use terrabot_core::{Error, Result};

pub mod dataset;
pub mod firestore;
pub mod lang;
pub mod memory;
pub mod openai_compat;
pub mod pdf;

/// Shared HTTP client for every outbound call.
///
/// `request_timeout` is the ceiling; callers with tighter budgets set per-request timeouts.
pub fn http_client(request_timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("terrabot/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .connect_timeout(Duration::from_secs(10))
        .timeout(request_timeout)
        .build()
        .map_err(|e| Error::NotConfigured(format!("http client: {e}")))
}
