use crate::config::PluginConfig;
use crate::error::{CompletionError, RelayResult};
use crate::models::{ChatRequest, ChatResponse};
use crate::types::ProviderId;
use crate::utils::join_url;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait Provider: Send + Sync {
    fn id(&self) -> ProviderId;
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse, CompletionError>;
}

/// OpenAI-compatible `/chat/completions` backend.
pub struct OpenAIProvider {
    pub api_key: String,
    pub url_chat: String,
    pub client: Client,
}

impl OpenAIProvider {
    /// Build the provider and its HTTP client once, from validated configuration.
    pub fn from_config(config: &PluginConfig) -> RelayResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            api_key: config.api_key.clone(),
            url_chat: join_url(&config.api_address, "chat/completions"),
            client,
        })
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(ProviderId::OPENAI)
    }

    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse, CompletionError> {
        debug!(model = %req.model, url = %self.url_chat, "POST chat completion");
        let resp = self
            .client
            .post(&self.url_chat)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Http { status, body });
        }
        let chat_resp: ChatResponse = resp.json().await?;
        Ok(chat_resp)
    }
}
