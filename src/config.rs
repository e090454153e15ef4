use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{RelayError, RelayResult};

pub const DEFAULT_API_ADDRESS: &str = "https://api.openai.com/v1";
pub const DEFAULT_TRIGGER_WORD: &str = "chat";
pub const DEFAULT_ERROR_MESSAGE: &str = "回答出错了，请联系管理员。";
pub const DEFAULT_PENDING_MESSAGE: &str = "查询中，请耐心等待...";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Chat models accepted by the plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChatModel {
    #[default]
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[serde(rename = "gpt-3.5-turbo-0301")]
    Gpt35Turbo0301,
}

impl ChatModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatModel::Gpt35Turbo => "gpt-3.5-turbo",
            ChatModel::Gpt35Turbo0301 => "gpt-3.5-turbo-0301",
        }
    }
}

impl fmt::Display for ChatModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plugin configuration as supplied by the host.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_address")]
    pub api_address: String,
    #[serde(default = "default_trigger_word")]
    pub trigger_word: String,
    #[serde(default)]
    pub model: ChatModel,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(rename = "max_tokens", default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(rename = "top_p", default = "default_top_p")]
    pub top_p: f32,
    #[serde(rename = "frequency_penalty", default)]
    pub frequency_penalty: f32,
    #[serde(rename = "presence_penalty", default)]
    pub presence_penalty: f32,
    #[serde(default)]
    pub stop: Option<Vec<String>>,
    #[serde(default = "default_error_message")]
    pub error_message: String,
    #[serde(default = "default_pending_message")]
    pub pending_message: String,
    #[serde(default)]
    pub picture_mode: bool,
    #[serde(default)]
    pub render_endpoint: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// The key never reaches logs.
impl fmt::Debug for PluginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginConfig")
            .field("api_key", &"<redacted>")
            .field("api_address", &self.api_address)
            .field("trigger_word", &self.trigger_word)
            .field("model", &self.model)
            .field("generation", &self.generation())
            .field("error_message", &self.error_message)
            .field("pending_message", &self.pending_message)
            .field("picture_mode", &self.picture_mode)
            .field("render_endpoint", &self.render_endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_api_address() -> String {
    DEFAULT_API_ADDRESS.to_string()
}

fn default_trigger_word() -> String {
    DEFAULT_TRIGGER_WORD.to_string()
}

fn default_temperature() -> f32 {
    1.0
}

fn default_max_tokens() -> u32 {
    100
}

fn default_top_p() -> f32 {
    1.0
}

fn default_error_message() -> String {
    DEFAULT_ERROR_MESSAGE.to_string()
}

fn default_pending_message() -> String {
    DEFAULT_PENDING_MESSAGE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl PluginConfig {
    /// Configuration with every optional field at its default.
    pub fn new(api_key: impl Into<String>, api_address: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_address: api_address.into(),
            trigger_word: default_trigger_word(),
            model: ChatModel::default(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop: None,
            error_message: default_error_message(),
            pending_message: default_pending_message(),
            picture_mode: false,
            render_endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> RelayResult<Self> {
        let config: PluginConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> RelayResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Reject configurations no completion call could succeed with.
    pub fn validate(&self) -> RelayResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(RelayError::Configuration("apiKey is required".to_string()));
        }
        if self.api_address.trim().is_empty() {
            return Err(RelayError::Configuration("apiAddress is required".to_string()));
        }
        let address = url::Url::parse(self.api_address.trim())?;
        if !matches!(address.scheme(), "http" | "https") {
            return Err(RelayError::Configuration(format!(
                "apiAddress must be an http(s) URL, got {}",
                self.api_address
            )));
        }
        if self.trigger_word.is_empty() || self.trigger_word.chars().any(char::is_whitespace) {
            return Err(RelayError::Configuration(format!(
                "triggerWord must be a single non-empty word, got {:?}",
                self.trigger_word
            )));
        }
        if self.max_tokens == 0 {
            return Err(RelayError::Configuration("max_tokens must be positive".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(RelayError::Configuration("timeoutSecs must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(RelayError::Configuration(format!(
                "top_p must be within 0..=1, got {}",
                self.top_p
            )));
        }
        if let Some(endpoint) = &self.render_endpoint {
            url::Url::parse(endpoint)?;
        }
        Ok(())
    }

    /// The subset forwarded to every completion request.
    pub fn generation(&self) -> GenerationParams {
        GenerationParams {
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
            stop: self.stop.clone(),
        }
    }
}

/// Generation parameters passed unchanged into each completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model: ChatModel,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub stop: Option<Vec<String>>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        PluginConfig::new("", DEFAULT_API_ADDRESS).generation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn minimal_json_gets_defaults() {
        let config = PluginConfig::from_json(r#"{"apiKey": "sk-test"}"#).unwrap();
        assert_eq!(config.api_address, DEFAULT_API_ADDRESS);
        assert_eq!(config.trigger_word, "chat");
        assert_eq!(config.model, ChatModel::Gpt35Turbo);
        assert_eq!(config.temperature, 1.0);
        assert_eq!(config.max_tokens, 100);
        assert_eq!(config.top_p, 1.0);
        assert_eq!(config.frequency_penalty, 0.0);
        assert_eq!(config.presence_penalty, 0.0);
        assert_eq!(config.stop, None);
        assert_eq!(config.error_message, DEFAULT_ERROR_MESSAGE);
        assert!(!config.picture_mode);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn host_schema_names_are_accepted() {
        let json = r#"{
            "apiKey": "sk-test",
            "apiAddress": "http://localhost:8080/v1",
            "triggerWord": "ask",
            "model": "gpt-3.5-turbo-0301",
            "temperature": 0.2,
            "max_tokens": 256,
            "top_p": 0.9,
            "frequency_penalty": -1.5,
            "presence_penalty": 1.25,
            "stop": ["\n\n", "END"],
            "errorMessage": "oops",
            "pictureMode": true,
            "renderEndpoint": "http://localhost:3000/render"
        }"#;
        let config = PluginConfig::from_json(json).unwrap();
        assert_eq!(config.trigger_word, "ask");
        assert_eq!(
            config.generation(),
            GenerationParams {
                model: ChatModel::Gpt35Turbo0301,
                temperature: 0.2,
                max_tokens: 256,
                top_p: 0.9,
                frequency_penalty: -1.5,
                presence_penalty: 1.25,
                stop: Some(vec!["\n\n".to_string(), "END".to_string()]),
            }
        );
        assert!(config.picture_mode);
    }

    #[test]
    fn missing_key_is_rejected() {
        let err = PluginConfig::from_json(r#"{"apiAddress": "https://api.openai.com/v1"}"#).unwrap_err();
        assert!(matches!(err, RelayError::Configuration(_)));
    }

    #[test]
    fn empty_address_is_rejected() {
        let config = PluginConfig::new("sk-test", "  ");
        assert!(matches!(config.validate(), Err(RelayError::Configuration(_))));
    }

    #[test]
    fn unknown_model_fails_to_parse() {
        let err = PluginConfig::from_json(r#"{"apiKey": "k", "model": "davinci"}"#).unwrap_err();
        assert!(matches!(err, RelayError::Json(_)));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut config = PluginConfig::new("k", DEFAULT_API_ADDRESS);
        config.top_p = 1.5;
        assert!(config.validate().is_err());

        let mut config = PluginConfig::new("k", DEFAULT_API_ADDRESS);
        config.max_tokens = 0;
        assert!(config.validate().is_err());

        let mut config = PluginConfig::new("k", DEFAULT_API_ADDRESS);
        config.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = PluginConfig::new("k", DEFAULT_API_ADDRESS);
        config.trigger_word = "two words".into();
        assert!(config.validate().is_err());

        let config = PluginConfig::new("k", "ftp://example.com");
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_output_redacts_key() {
        let config = PluginConfig::new("sk-secret", DEFAULT_API_ADDRESS);
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
