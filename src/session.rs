//! The host's conversational context, as seen by the plugin.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::RelayResult;

/// Content the plugin hands back to the chat transport.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingMessage {
    Text(String),
    Image { data: Bytes, mime: String },
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        OutgoingMessage::Text(content.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            OutgoingMessage::Text(text) => Some(text),
            OutgoingMessage::Image { .. } => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, OutgoingMessage::Image { .. })
    }
}

/// A chat session owned by the host. The plugin only writes onto it.
#[async_trait]
pub trait Session: Send + Sync {
    /// Stable identifier used in log fields.
    fn id(&self) -> &str;

    /// Deliver a message to the user immediately.
    async fn send(&self, message: OutgoingMessage) -> RelayResult<()>;
}
