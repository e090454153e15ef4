//! Chat-bot command plugin relaying user prompts to an OpenAI-compatible
//! chat completion API.
//!
//! A configured trigger word binds a [`CommandPipeline`]: it acknowledges the
//! user, asks the [`CompletionClient`] for a completion, substitutes the
//! configured error message on failure and, in picture mode, renders the
//! reply to an image before it is sent.

pub mod client;
pub mod config;
pub mod console;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod plugin;
pub mod providers;
pub mod render;
pub mod session;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use client::CompletionClient;
pub use console::{serve_lines, ConsoleSession};
pub use config::{ChatModel, GenerationParams, PluginConfig};
pub use error::{CompletionError, RelayError, RelayResult};
pub use models::{ChatMessage, ChatRequest, ChatResponse};
pub use pipeline::{parse_command, CommandPipeline};
pub use plugin::{ChatPlugin, PLUGIN_NAME};
pub use providers::{OpenAIProvider, Provider};
pub use render::{HttpRenderer, RenderedImage, Renderer, ReplyPostProcessor};
pub use session::{OutgoingMessage, Session};
pub use types::{ProviderId, RequestId};

/// Initialize the logging system
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
