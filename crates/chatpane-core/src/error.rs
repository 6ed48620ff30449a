use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the chat or translate endpoint
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (connection refused, timeout, TLS...)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-2xx status
    #[error("Server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The server answered 2xx but the body was not the expected JSON
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// The task running the request panicked or was cancelled
    #[error("Request task failed: {0}")]
    Task(String),
}

/// Why a submit was rejected before any request was made
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Message is empty")]
    Empty,

    #[error("Still waiting for the previous reply")]
    Busy,
}

/// Why a translate toggle could not be activated
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToggleError {
    #[error("Message cannot be translated")]
    NotTranslatable,

    #[error("Translation already in progress")]
    Pending,

    #[error("Message is already translated")]
    AlreadyTranslated,

    #[error("Message is not translated")]
    NotTranslated,
}
