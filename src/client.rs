use crate::config::{GenerationParams, PluginConfig};
use crate::error::{CompletionError, RelayResult};
use crate::models::ChatRequest;
use crate::providers::{OpenAIProvider, Provider};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Completion client shared by every invocation; read-only after construction.
pub struct CompletionClient {
    provider: Arc<dyn Provider>,
    params: GenerationParams,
}

impl CompletionClient {
    pub fn new(provider: Arc<dyn Provider>, params: GenerationParams) -> Self {
        Self { provider, params }
    }

    pub fn from_config(config: &PluginConfig) -> RelayResult<Self> {
        let provider: Arc<dyn Provider> = Arc::new(OpenAIProvider::from_config(config)?);
        Ok(Self::new(provider, config.generation()))
    }

    /// Send `message` as a single user turn and return the first choice's text.
    ///
    /// A response without content yields an empty string.
    pub async fn complete(&self, message: &str) -> Result<String, CompletionError> {
        let provider = self.provider.id().to_string();
        let model = self.params.model.as_str();
        let req = ChatRequest::single_turn(&self.params, message);

        let start = Instant::now();
        let resp = self.provider.chat(&req).await;
        histogram!("relay_request_latency_seconds", start.elapsed().as_secs_f64(), "provider" => provider.clone());

        match resp {
            Ok(r) => {
                counter!("relay_requests_total", 1, "provider" => provider.clone(), "result" => "success");
                if let Some(usage) = &r.usage {
                    counter!("relay_prompt_tokens_total", usage.prompt_tokens as u64, "provider" => provider.clone(), "model" => model);
                    counter!("relay_completion_tokens_total", usage.completion_tokens as u64, "provider" => provider.clone(), "model" => model);
                }
                let content = r.get_content().unwrap_or_default().to_string();
                info!(
                    %provider,
                    model,
                    choices = r.choices.len(),
                    reply_len = content.len(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    "chat completion completed"
                );
                Ok(content)
            }
            Err(e) => {
                counter!("relay_requests_total", 1, "provider" => provider.clone(), "result" => e.kind());
                warn!(
                    %provider,
                    model,
                    kind = e.kind(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    "chat completion failed"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatChoice, ChatMessage, ChatResponse, ResponseMessage};
    use crate::types::ProviderId;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use reqwest::StatusCode;
    use std::sync::Mutex;

    struct Canned {
        reply: Result<Option<&'static str>, CompletionError>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl Canned {
        fn new(reply: Result<Option<&'static str>, CompletionError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Provider for Canned {
        fn id(&self) -> ProviderId {
            ProviderId::new("canned")
        }

        async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse, CompletionError> {
            self.seen.lock().unwrap().push(req.clone());
            let content = self.reply.clone()?;
            Ok(ChatResponse {
                id: "id".into(),
                model: req.model.clone(),
                choices: vec![ChatChoice {
                    index: 0,
                    message: ResponseMessage {
                        role: Some("assistant".into()),
                        content: content.map(str::to_string),
                    },
                    finish_reason: Some("stop".into()),
                }],
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn returns_first_choice_verbatim() {
        let provider = Canned::new(Ok(Some("  spaced\nreply  ")));
        let client = CompletionClient::new(provider.clone(), GenerationParams::default());
        let text = client.complete("hello").await.unwrap();
        assert_eq!(text, "  spaced\nreply  ");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages, vec![ChatMessage::user("hello")]);
    }

    #[tokio::test]
    async fn missing_content_is_empty_text() {
        let client = CompletionClient::new(Canned::new(Ok(None)), GenerationParams::default());
        assert_eq!(client.complete("hello").await.unwrap(), "");
    }

    #[tokio::test]
    async fn errors_are_passed_through_classified() {
        let err = CompletionError::Http {
            status: StatusCode::UNAUTHORIZED,
            body: "bad key".into(),
        };
        let client = CompletionClient::new(Canned::new(Err(err.clone())), GenerationParams::default());
        assert_eq!(client.complete("hello").await.unwrap_err(), err);
    }

    #[tokio::test]
    async fn generation_params_are_forwarded() {
        let params = GenerationParams {
            temperature: 0.3,
            max_tokens: 7,
            top_p: 0.5,
            frequency_penalty: 1.0,
            presence_penalty: -1.0,
            stop: Some(vec!["###".into()]),
            ..GenerationParams::default()
        };
        let provider = Canned::new(Ok(Some("ok")));
        let client = CompletionClient::new(provider.clone(), params.clone());
        client.complete("a").await.unwrap();
        client.complete("b").await.unwrap();

        for req in provider.seen.lock().unwrap().iter() {
            assert_eq!(req.temperature, params.temperature);
            assert_eq!(req.max_tokens, params.max_tokens);
            assert_eq!(req.top_p, params.top_p);
            assert_eq!(req.frequency_penalty, params.frequency_penalty);
            assert_eq!(req.presence_penalty, params.presence_penalty);
            assert_eq!(req.stop, params.stop);
            assert_eq!(req.model, "gpt-3.5-turbo");
        }
    }
}
