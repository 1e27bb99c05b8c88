//! Errors surfaced by the engines to the API and CLI

use thiserror::Error;

use crate::domain::ValidationError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Machine-readable error code used in response envelopes
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound { .. } => "NOT_FOUND",
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status the REST layer answers with
    pub fn http_status(&self) -> u16 {
        match self {
            EngineError::NotFound { .. } => 404,
            EngineError::Validation(_) => 400,
            EngineError::Internal(_) => 500,
        }
    }

    /// Message safe to show to API clients; internal detail is withheld
    pub fn public_message(&self) -> String {
        match self {
            EngineError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ContractStatus;

    #[test]
    fn codes_and_statuses() {
        let nf = EngineError::not_found("Contract", "ct-0000000000");
        assert_eq!(nf.code(), "NOT_FOUND");
        assert_eq!(nf.http_status(), 404);
        assert_eq!(nf.to_string(), "Contract not found");

        let v: EngineError = ValidationError::TerminalStatus(ContractStatus::Locked).into();
        assert_eq!(v.code(), "VALIDATION_ERROR");
        assert_eq!(v.http_status(), 400);
        assert_eq!(v.public_message(), "Cannot transition from terminal status: LOCKED");
    }

    #[test]
    fn internal_detail_is_hidden() {
        let err = EngineError::from(anyhow::anyhow!("disk I/O error at /secret/path"));
        assert_eq!(err.http_status(), 500);
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(err.public_message(), "Internal server error");
        assert!(err.to_string().contains("disk I/O"));
    }
}
