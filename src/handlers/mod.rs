//! Notification handlers
//!
//! A handler owns one notification transport: it renders a trigger's payload
//! with the trigger's own render function, splits the message to fit the
//! transport's size limit, and delivers each chunk.

pub mod discord;
pub mod telegram;

pub use discord::DiscordHandler;
pub use telegram::TelegramHandler;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::text::TextError;
use crate::triggers::RenderFn;

/// Errors from delivering a notification
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The rendered message could not be split to fit the transport limit.
    /// A content defect, not a transient fault.
    #[error("chunking failed: {0}")]
    Chunking(#[from] TextError),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// One notification transport
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handler type name, for executor logging
    fn name(&self) -> &'static str;

    /// Render the payload with the originating trigger's render function and
    /// deliver it. Errors are reported to the executor, which isolates them
    /// from sibling handlers.
    async fn handle(&self, info: &Value, render: RenderFn) -> Result<(), HandlerError>;
}
