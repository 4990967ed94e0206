use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// The peer could not be reached, timed out, or answered with something
    /// that is not a valid envelope
    #[error("Connectivity error: {message}")]
    Connectivity { message: String },

    /// The peer answered with a well-formed envelope carrying a non-zero code
    #[error("Business error ({code}): {message}")]
    Business { code: i64, message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::Connectivity {
            message: message.into(),
        }
    }

    pub fn business(code: i64, message: impl Into<String>) -> Self {
        Self::Business {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }

    pub fn is_business(&self) -> bool {
        matches!(self, Self::Business { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("Team 'ABC123' not found");
        assert_eq!(error.to_string(), "Not found: Team 'ABC123' not found");
    }

    #[test]
    fn test_validation_error() {
        let error = DomainError::validation("Invalid input");
        assert_eq!(error.to_string(), "Validation error: Invalid input");
    }

    #[test]
    fn test_business_error_carries_code() {
        let error = DomainError::business(600002, "team not found");
        assert_eq!(error.to_string(), "Business error (600002): team not found");
        assert!(error.is_business());
        assert!(!error.is_connectivity());
    }

    #[test]
    fn test_connectivity_error() {
        let error = DomainError::connectivity("connection refused");
        assert!(error.is_connectivity());
        assert!(!error.is_business());
    }
}
