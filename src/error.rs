//! Error types for hey-there

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid Application ID: {received}")]
    InvalidApplicationId { received: String },

    #[error("Invalid Intent: {0}")]
    InvalidIntent(String),

    #[error("Invalid Intent: {intent} is missing slot {slot}")]
    MissingSlot { intent: String, slot: String },

    #[error("Unknown request type {0}")]
    UnknownRequestType(String),

    #[error("Message addressed to {attempted_name} was not matched to a configured number.")]
    RecipientNotFound { attempted_name: String },

    #[error("Cannot send yet, no {0} has been given.")]
    MissingField(&'static str),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Failures absorbed into the spoken response instead of failing the turn
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Error::RecipientNotFound { .. } | Error::Transport(_) | Error::MissingField(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
