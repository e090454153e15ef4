//! One user invocation: acknowledge, complete, fall back, post-process, reply.

use std::sync::Arc;
use tracing::{info, warn, Instrument};

use crate::client::CompletionClient;
use crate::error::{CompletionError, RelayResult};
use crate::render::ReplyPostProcessor;
use crate::session::{OutgoingMessage, Session};
use crate::types::RequestId;
use crate::utils::make_snippet;

/// Split `input` into the argument of `trigger`, if the first word is the trigger.
pub fn parse_command<'a>(trigger: &str, input: &'a str) -> Option<&'a str> {
    let input = input.trim_start();
    let rest = input.strip_prefix(trigger)?;
    if rest.is_empty() {
        return Some(rest);
    }
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim_start())
}

/// Handler bound to the trigger word. Holds no per-invocation state.
pub struct CommandPipeline {
    trigger_word: String,
    pending_message: String,
    error_message: String,
    client: Arc<CompletionClient>,
    post: ReplyPostProcessor,
}

impl CommandPipeline {
    pub fn new(
        trigger_word: impl Into<String>,
        pending_message: impl Into<String>,
        error_message: impl Into<String>,
        client: Arc<CompletionClient>,
        post: ReplyPostProcessor,
    ) -> Self {
        Self {
            trigger_word: trigger_word.into(),
            pending_message: pending_message.into(),
            error_message: error_message.into(),
            client,
            post,
        }
    }

    pub fn trigger_word(&self) -> &str {
        &self.trigger_word
    }

    /// Run the command if `input` starts with the trigger word and send the reply.
    ///
    /// Returns `false` when the input is not addressed to this command.
    pub async fn dispatch(&self, session: &dyn Session, input: &str) -> RelayResult<bool> {
        let Some(argument) = parse_command(&self.trigger_word, input) else {
            return Ok(false);
        };
        let reply = self.execute(session, argument).await;
        session.send(reply).await?;
        Ok(true)
    }

    /// Produce the final reply for `argument`; never fails.
    pub async fn execute(&self, session: &dyn Session, argument: &str) -> OutgoingMessage {
        let request_id = RequestId::new();
        let span = tracing::info_span!("command", trigger = %self.trigger_word, session = session.id(), %request_id);
        async {
            info!(argument_len = argument.len(), "command received");

            if let Err(e) = session.send(OutgoingMessage::text(self.pending_message.as_str())).await {
                warn!(error = %e, "acknowledgment could not be sent");
            }

            let text = match self.client.complete(argument).await {
                Ok(text) => text,
                Err(CompletionError::Http { status, body }) => {
                    warn!(%status, body = %make_snippet(&body), "completion rejected by endpoint");
                    self.error_message.clone()
                }
                Err(CompletionError::Transport(message)) => {
                    warn!(error = %message, "completion transport failure");
                    self.error_message.clone()
                }
            };

            self.post.process(OutgoingMessage::Text(text)).await
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_with_argument() {
        assert_eq!(parse_command("chat", "chat hello world"), Some("hello world"));
        assert_eq!(parse_command("chat", "  chat\thow are you?\n"), Some("how are you?\n"));
    }

    #[test]
    fn bare_trigger_has_empty_argument() {
        assert_eq!(parse_command("chat", "chat"), Some(""));
        assert_eq!(parse_command("chat", "chat   "), Some(""));
    }

    #[test]
    fn other_words_do_not_match() {
        assert_eq!(parse_command("chat", "chatter hi"), None);
        assert_eq!(parse_command("chat", "hello chat"), None);
        assert_eq!(parse_command("chat", ""), None);
    }
}
