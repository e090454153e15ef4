//! Picture mode: turning outgoing text replies into rendered images.
//!
//! The rendering engine itself is a collaborator behind [`Renderer`]. This
//! module only prepares the markup and decides what leaves the plugin when
//! rendering fails (the plain-text reply, with a warning logged).

use async_trait::async_trait;
use bytes::Bytes;
use metrics::counter;
use reqwest::{header, Client};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::PluginConfig;
use crate::error::{RelayError, RelayResult};
use crate::session::OutgoingMessage;
use crate::utils::make_snippet;

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Literal boundary tokens of the page template, removed from reply text.
const TEMPLATE_TOKENS: [&str; 2] = ["<template>", "</template>"];

const PAGE_HEAD: &str = concat!(
    "<html><head><meta charset=\"utf-8\"><style>",
    "body{margin:0;padding:16px;background:#fff;}",
    "div{font-family:sans-serif;font-size:16px;line-height:1.5;white-space:normal;word-break:break-word;}",
    "</style></head><body><div>",
);
const PAGE_TAIL: &str = "</div></body></html>";

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub data: Bytes,
    pub mime: String,
}

/// Converts an HTML page into an image buffer.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, markup: &str) -> RelayResult<RenderedImage>;
}

/// Remove template tokens, escape markup characters and turn newlines into `<br>`.
pub fn sanitize_reply(text: &str) -> String {
    let mut cleaned = text.to_string();
    for token in TEMPLATE_TOKENS {
        cleaned = cleaned.replace(token, "");
    }
    let mut out = String::with_capacity(cleaned.len());
    for ch in cleaned.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => {}
            '\n' => out.push_str("<br>"),
            c => out.push(c),
        }
    }
    out
}

/// Full page submitted to the renderer.
pub fn build_markup(text: &str) -> String {
    format!("{PAGE_HEAD}{}{PAGE_TAIL}", sanitize_reply(text))
}

/// Renderer backed by an HTTP service that answers a POSTed HTML page with image bytes.
pub struct HttpRenderer {
    endpoint: String,
    client: Client,
}

impl HttpRenderer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> RelayResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, markup: &str) -> RelayResult<RenderedImage> {
        debug!(endpoint = %self.endpoint, markup_len = markup.len(), "POST render");
        let resp = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
            .body(markup.to_string())
            .send()
            .await
            .map_err(|e| RelayError::Render(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RelayError::Render(format!("status {status}: {}", make_snippet(&body))));
        }
        let mime = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or(DEFAULT_IMAGE_MIME)
            .to_string();
        let data = resp.bytes().await.map_err(|e| RelayError::Render(e.to_string()))?;
        if data.is_empty() {
            return Err(RelayError::Render("renderer returned an empty body".to_string()));
        }
        Ok(RenderedImage { data, mime })
    }
}

/// Last stage before a reply leaves the plugin.
#[derive(Clone)]
pub struct ReplyPostProcessor {
    renderer: Option<Arc<dyn Renderer>>,
}

impl ReplyPostProcessor {
    /// Plain text goes out unchanged.
    pub fn passthrough() -> Self {
        Self { renderer: None }
    }

    pub fn picture_mode(renderer: Arc<dyn Renderer>) -> Self {
        Self {
            renderer: Some(renderer),
        }
    }

    /// Picture mode with an [`HttpRenderer`] when the configuration asks for it.
    pub fn from_config(config: &PluginConfig) -> RelayResult<Self> {
        if !config.picture_mode {
            return Ok(Self::passthrough());
        }
        let endpoint = config.render_endpoint.as_deref().ok_or_else(|| {
            RelayError::Configuration("pictureMode requires renderEndpoint".to_string())
        })?;
        let renderer = HttpRenderer::new(endpoint, Duration::from_secs(config.timeout_secs))?;
        Ok(Self::picture_mode(Arc::new(renderer)))
    }

    pub async fn process(&self, reply: OutgoingMessage) -> OutgoingMessage {
        let renderer = match &self.renderer {
            Some(renderer) => renderer,
            None => return reply,
        };
        let markup = match &reply {
            OutgoingMessage::Text(text) => build_markup(text),
            OutgoingMessage::Image { .. } => return reply,
        };
        match renderer.render(&markup).await {
            Ok(image) => OutgoingMessage::Image {
                data: image.data,
                mime: image.mime,
            },
            Err(e) => {
                counter!("relay_render_failures_total", 1);
                warn!(error = %e, "render failed, sending plain text");
                reply
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct Recording {
        markup: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Renderer for Recording {
        async fn render(&self, markup: &str) -> RelayResult<RenderedImage> {
            self.markup.lock().unwrap().push(markup.to_string());
            if self.fail {
                return Err(RelayError::Render("boom".into()));
            }
            Ok(RenderedImage {
                data: Bytes::from(markup.as_bytes().to_vec()),
                mime: DEFAULT_IMAGE_MIME.into(),
            })
        }
    }

    fn recording(fail: bool) -> Arc<Recording> {
        Arc::new(Recording {
            markup: Mutex::new(Vec::new()),
            fail,
        })
    }

    #[test]
    fn template_tokens_are_stripped_before_line_breaks() {
        assert_eq!(sanitize_reply("Hello\n<template>World</template>"), "Hello<br>World");
    }

    #[test]
    fn markup_characters_are_escaped() {
        assert_eq!(sanitize_reply("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
        assert_eq!(sanitize_reply("one\r\ntwo\n\nthree"), "one<br>two<br><br>three");
    }

    #[test]
    fn page_wraps_sanitized_text() {
        let page = build_markup("x\ny");
        assert!(page.starts_with("<html>"));
        assert!(page.contains("<div>x<br>y</div>"));
    }

    #[tokio::test]
    async fn passthrough_leaves_text_alone() {
        let post = ReplyPostProcessor::passthrough();
        let reply = OutgoingMessage::text("plain\ntext");
        assert_eq!(post.process(reply.clone()).await, reply);
    }

    #[tokio::test]
    async fn picture_mode_replaces_text_with_image() {
        let renderer = recording(false);
        let post = ReplyPostProcessor::picture_mode(renderer.clone());
        let out = post.process(OutgoingMessage::text("Hello\n<template>World</template>")).await;
        assert!(out.is_image());
        let seen = renderer.markup.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("Hello<br>World"));
    }

    #[tokio::test]
    async fn render_failure_falls_back_to_text() {
        let post = ReplyPostProcessor::picture_mode(recording(true));
        let reply = OutgoingMessage::text("still here");
        assert_eq!(post.process(reply.clone()).await, reply);
    }

    #[test]
    fn picture_mode_without_endpoint_is_rejected() {
        let mut config = PluginConfig::new("k", crate::config::DEFAULT_API_ADDRESS);
        config.picture_mode = true;
        assert!(matches!(
            ReplyPostProcessor::from_config(&config),
            Err(RelayError::Configuration(_))
        ));
    }
}
