use std::sync::Arc;
use tracing::info;

use crate::client::CompletionClient;
use crate::config::PluginConfig;
use crate::error::RelayResult;
use crate::pipeline::CommandPipeline;
use crate::providers::Provider;
use crate::render::{ReplyPostProcessor, Renderer};
use crate::session::Session;

pub const PLUGIN_NAME: &str = "openai-chatgpt";

/// The plugin after a successful bootstrap; owns the registered command.
pub struct ChatPlugin {
    pipeline: Arc<CommandPipeline>,
}

impl ChatPlugin {
    /// Validate `config` and register the command against the OpenAI backend.
    pub fn apply(config: PluginConfig) -> RelayResult<Self> {
        config.validate()?;
        let client = CompletionClient::from_config(&config)?;
        let post = ReplyPostProcessor::from_config(&config)?;
        Ok(Self::register(config, client, post))
    }

    /// Same as [`ChatPlugin::apply`] with caller-supplied backend and renderer.
    pub fn with_parts(
        config: PluginConfig,
        provider: Arc<dyn Provider>,
        renderer: Option<Arc<dyn Renderer>>,
    ) -> RelayResult<Self> {
        config.validate()?;
        let client = CompletionClient::new(provider, config.generation());
        let post = match renderer {
            Some(renderer) if config.picture_mode => ReplyPostProcessor::picture_mode(renderer),
            _ => ReplyPostProcessor::from_config(&config)?,
        };
        Ok(Self::register(config, client, post))
    }

    fn register(config: PluginConfig, client: CompletionClient, post: ReplyPostProcessor) -> Self {
        let pipeline = CommandPipeline::new(
            config.trigger_word.clone(),
            config.pending_message.clone(),
            config.error_message.clone(),
            Arc::new(client),
            post,
        );
        info!(
            plugin = PLUGIN_NAME,
            trigger = %config.trigger_word,
            model = %config.model,
            picture_mode = config.picture_mode,
            "command registered"
        );
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn pipeline(&self) -> Arc<CommandPipeline> {
        self.pipeline.clone()
    }

    /// Offer one inbound message to the plugin's command.
    pub async fn handle(&self, session: &dyn Session, input: &str) -> RelayResult<bool> {
        self.pipeline.dispatch(session, input).await
    }
}
