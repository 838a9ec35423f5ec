use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Process-wide client. The timeout of the first call sticks.
pub fn http_client(timeout: Duration) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build http client")
    })
}

pub fn fetch_text(url: &str, timeout: Duration) -> Result<String> {
    let client = http_client(timeout)?;
    let resp = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .with_context(|| format!("request failed: {url}"))?
        .error_for_status()
        .with_context(|| format!("bad status: {url}"))?;
    resp.text().context("failed to read response body")
}
