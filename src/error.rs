// Error types for the resume tailor session core.
// Covers storage failures, protocol misuse, and backend API errors.

use thiserror::Error;

use crate::state::OperationKind;

#[derive(Error, Debug)]
pub enum TailorError {
    #[error("Storage unavailable: {0}")]
    Infra(String),

    #[error("A {0} operation is already in progress")]
    OperationAlreadyInProgress(OperationKind),

    #[error("Cannot continue: {0}")]
    Precondition(String),

    #[error("Backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Your session has expired, please sign in again")]
    Unauthorized,

    /// Carries the backend's reason, or the missing route.
    #[error("{0}")]
    NotFound(String),

    #[error("Request timeout: the server took too long to respond")]
    Timeout,

    #[error("Backend returned a non-JSON response (HTTP {status}){hint}")]
    NonJson { status: u16, hint: String },

    #[error("{0}")]
    Backend(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TailorError {
    /// Whether this error came from the persistent store rather than the
    /// caller or the backend.
    pub fn is_infra(&self) -> bool {
        matches!(
            self,
            TailorError::Infra(_) | TailorError::Io(_) | TailorError::Json(_)
        )
    }

    /// Whether the backend rejected the credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TailorError::Unauthorized)
    }
}

pub type Result<T> = std::result::Result<T, TailorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infra_classification() {
        assert!(TailorError::Infra("disk full".into()).is_infra());
        assert!(TailorError::Io(std::io::Error::other("boom")).is_infra());
        assert!(!TailorError::Precondition("no resume".into()).is_infra());
        assert!(!TailorError::Unauthorized.is_infra());
        assert!(!TailorError::NotFound("Resume not found".into()).is_infra());
    }

    #[test]
    fn test_display_messages() {
        let err = TailorError::OperationAlreadyInProgress(OperationKind::Tailor);
        assert_eq!(err.to_string(), "A tailor operation is already in progress");

        let err = TailorError::NonJson {
            status: 502,
            hint: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "Backend returned a non-JSON response (HTTP 502)"
        );
    }
}
