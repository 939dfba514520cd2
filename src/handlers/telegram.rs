//! Telegram bot handler

use async_trait::async_trait;
use serde_json::Value;

use crate::handlers::{Handler, HandlerError};
use crate::text::smart_split;
use crate::triggers::RenderFn;

/// Telegram's hard limit for one message.
const MAX_MESSAGE_LENGTH: usize = 4096;

/// Delivers alerts through the Telegram bot API
pub struct TelegramHandler {
    token: String,
    chat_id: String,
    http_client: reqwest::Client,
}

impl TelegramHandler {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            chat_id: chat_id.into(),
            http_client: reqwest::Client::new(),
        }
    }
}

/// Escape characters Telegram's MarkdownV2 parser treats as formatting, so
/// raw punctuation in a message is not rejected or mangled by the API.
fn escape_markdown(text: &str) -> String {
    text.replace('_', r"\_")
        .replace('*', r"\*")
        .replace('[', r"\[")
        .replace('`', r"\`")
        .replace('(', r"\(")
        .replace('-', r"\-")
        .replace('.', r"\.")
}

#[async_trait]
impl Handler for TelegramHandler {
    fn name(&self) -> &'static str {
        "TelegramHandler"
    }

    async fn handle(&self, info: &Value, render: RenderFn) -> Result<(), HandlerError> {
        let message = escape_markdown(&render(info));
        let chunks = smart_split(&message, MAX_MESSAGE_LENGTH, " ")?;

        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);
        for chunk in chunks {
            let response = self
                .http_client
                .post(&url)
                .json(&serde_json::json!({
                    "chat_id": self.chat_id,
                    "text": chunk,
                    "parse_mode": "MarkdownV2",
                }))
                .send()
                .await
                .map_err(|e| HandlerError::Delivery(e.to_string()))?;

            if !response.status().is_success() {
                return Err(HandlerError::Delivery(format!(
                    "Telegram API returned status {}",
                    response.status()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_markdown_significant_characters() {
        assert_eq!(
            escape_markdown("a_b *bold* [link](url) `code` - x.y"),
            r"a\_b \*bold\* \[link]\(url) \`code\` \- x\.y"
        );
    }

    #[test]
    fn test_escape_markdown_leaves_plain_text_alone() {
        assert_eq!(escape_markdown("plain text 123"), "plain text 123");
    }
}
