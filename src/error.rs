use thiserror::Error;

/// Failures of the flight-offers provider. The orchestrator turns these into a
/// note on the reply instead of aborting the turn.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum TravelAgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Reply generation failed: {0}")]
    GenerationFailed(String),

    #[error("Translation failed: {0}")]
    TranslationFailed(String),

    #[error("Flight search failed: {0}")]
    SearchFailed(#[from] SearchError),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Speech synthesis failed: {0}")]
    SpeechFailed(String),

    #[error("Image generation failed: {0}")]
    ImageFailed(String),

    #[error("Validation error: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TravelAgentError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TravelAgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_error_display() {
        let err = SearchError::Auth("invalid_client".to_string());
        assert_eq!(err.to_string(), "authentication failed: invalid_client");

        let err = SearchError::Status {
            status: 400,
            body: "INVALID DATE".to_string(),
        };
        assert_eq!(err.to_string(), "upstream returned 400: INVALID DATE");

        let err = SearchError::Malformed("missing data".to_string());
        assert_eq!(err.to_string(), "malformed payload: missing data");
    }

    #[test]
    fn test_search_failed_wraps_upstream_detail() {
        let err: TravelAgentError = SearchError::Status {
            status: 500,
            body: "boom".to_string(),
        }
        .into();
        assert!(matches!(err, TravelAgentError::SearchFailed(_)));
        assert_eq!(err.to_string(), "Flight search failed: upstream returned 500: boom");
    }

    #[test]
    fn test_validation_helper() {
        let err = TravelAgentError::validation("text", "must not be empty");
        assert_eq!(err.to_string(), "Validation error: text: must not be empty");
    }

    #[test]
    fn test_other_is_transparent() {
        let err: TravelAgentError = anyhow::anyhow!("raw detail").into();
        assert_eq!(err.to_string(), "raw detail");
    }
}
