//! Chat webhook notifier
//!
//! Posts winner announcements to a Discord-compatible webhook. Callers are
//! expected to treat failures as non-fatal — a down webhook never fails a
//! draw.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::ports::Notifier;

#[derive(Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Notifier posting to a chat webhook URL
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Notifier for WebhookNotifier {
    fn announce(&self, message: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { content: message })
            .send()
            .map_err(|e| Error::Other(format!("webhook request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Other(format!(
                "webhook returned HTTP {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }
}
