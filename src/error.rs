use thiserror::Error;

#[derive(Debug, Error)]
pub enum DigitError {
    /// The classifier could not be downloaded or deserialized. Nothing can be
    /// predicted in a session that hits this.
    #[error("model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    /// `predict` or `predict_proba` failed for a single cycle.
    #[error("inference failed: {0}")]
    InferenceFailure(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("download failed: {0}")]
    Download(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DigitError {
    pub fn model_unavailable(reason: impl Into<String>) -> Self {
        DigitError::ModelUnavailable {
            reason: reason.into(),
        }
    }

    pub fn is_model_unavailable(&self) -> bool {
        matches!(self, DigitError::ModelUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, DigitError>;
