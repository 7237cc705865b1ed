use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::cookie::Jar;
use reqwest::Client;

/// One client for the whole process. `cookies` is the jar the refresh
/// endpoint's cookie lives in; the composition root restores it from the
/// session store at startup and saves it back after each run.
pub fn build(timeout_ms: u64, cookies: Arc<Jar>) -> Result<Client> {
    let client = Client::builder()
        .cookie_provider(cookies)
        .timeout(Duration::from_millis(timeout_ms))
        .build()?;
    Ok(client)
}
