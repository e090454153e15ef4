use reqwest::StatusCode;
use serde_json;
use std::io;
use thiserror::Error;
use tokio::task::JoinError;

pub type RelayResult<T> = std::result::Result<T, RelayError>;

/// Main error type for the relay plugin
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration rejected at load time
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Completion call failed
    #[error(transparent)]
    Completion(#[from] CompletionError),

    /// Rendering collaborator failed to produce an image
    #[error("render error: {0}")]
    Render(String),

    /// Session refused an outgoing message
    #[error("session send failed: {0}")]
    Session(String),

    // Automatic conversions for common external error types
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    TokioJoin(#[from] JoinError),
}

/// Classified failure of a single chat-completion call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// The endpoint answered with a non-success status
    #[error("unexpected status {status}: {body}")]
    Http { status: StatusCode, body: String },

    /// No usable response: connection failure, timeout or undecodable body
    #[error("transport error: {0}")]
    Transport(String),
}

impl CompletionError {
    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            CompletionError::Http { status, .. } => Some(*status),
            CompletionError::Transport(_) => None,
        }
    }

    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            CompletionError::Http { .. } => "http",
            CompletionError::Transport(_) => "transport",
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CompletionError::Transport(format!("request timed out: {err}"))
        } else {
            CompletionError::Transport(err.to_string())
        }
    }
}
