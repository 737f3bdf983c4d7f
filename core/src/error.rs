use thiserror::Error;

#[derive(Error, Debug)]
pub enum PiggError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Backend(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PiggError {
    /// True for request problems detected before any store call.
    /// Everything else is a store failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, PiggError::MissingField { .. })
    }
}

pub type PiggResult<T> = Result<T, PiggError>;
