//! Discord webhook handler

use async_trait::async_trait;
use serde_json::Value;

use crate::handlers::{Handler, HandlerError};
use crate::text::smart_split;
use crate::triggers::RenderFn;

/// Discord caps message content at 4096 characters (embed description
/// limit); chunks are bounded to that in bytes, which is stricter.
const MAX_MESSAGE_LENGTH: usize = 4096;

/// Delivers alerts as Discord webhook posts
pub struct DiscordHandler {
    webhook_url: String,
    http_client: reqwest::Client,
}

impl DiscordHandler {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Handler for DiscordHandler {
    fn name(&self) -> &'static str {
        "DiscordHandler"
    }

    async fn handle(&self, info: &Value, render: RenderFn) -> Result<(), HandlerError> {
        let message = render(info);
        let chunks = smart_split(&message, MAX_MESSAGE_LENGTH, " ")?;

        for chunk in chunks {
            let response = self
                .http_client
                .post(&self.webhook_url)
                .json(&serde_json::json!({ "content": chunk }))
                .send()
                .await
                .map_err(|e| HandlerError::Delivery(e.to_string()))?;

            if !response.status().is_success() {
                return Err(HandlerError::Delivery(format!(
                    "Discord webhook returned status {}",
                    response.status()
                )));
            }
        }
        Ok(())
    }
}
