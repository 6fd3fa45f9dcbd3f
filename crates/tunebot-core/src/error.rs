use thiserror::Error;

/// Failures of a single assistant exchange.
///
/// None of these are retried. Apart from the user message appended before
/// dispatch, a failure leaves the conversation untouched.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Message is empty")]
    Validation,

    #[error("Network error: {0}")]
    Transport(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("A request is already in flight")]
    Busy,
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ChatError::Parse(e.to_string())
        } else {
            ChatError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::Parse(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to list music folder {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecognizerError {
    #[error("SDK initialization failed.")]
    NotInitialized,

    #[error("Failed to start recognition.")]
    StartFailed,

    #[error("Recognition already in progress")]
    AlreadyRecognizing,
}
