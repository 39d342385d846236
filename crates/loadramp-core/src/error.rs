use thiserror::Error;

/// Canonical error type for schedule compilation and decompilation.
#[derive(Debug, Error)]
pub enum RampError {
    /// A stage carries a value outside its domain (e.g. a negative count).
    #[error("invalid stage: {message}")]
    InvalidStage {
        /// Human-readable description of the offending value.
        message: String,
    },

    /// A stage holding an expression reached the batch decomposition engine.
    #[error("stage {index} is not literal: batch schedules require resolved numeric values")]
    NonLiteralStage {
        /// Position of the stage within the profile.
        index: usize,
    },

    /// A stage without a duration (iterations only) reached the batch decomposition engine.
    #[error("stage {index} has no duration: batch schedules cannot hold for iterations")]
    MissingDuration {
        /// Position of the stage within the profile.
        index: usize,
    },

    /// Profile combines expressions with a shape the uniform model cannot express.
    #[error("unsupported profile: {message}")]
    UnsupportedProfile {
        /// Human-readable explanation.
        message: String,
    },

    /// Profile operation applied in an order the model cannot express.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Human-readable explanation of the invalid state.
        message: String,
    },

    /// A persisted schedule table row could not be parsed.
    #[error("invalid schedule row: {message}")]
    InvalidRow {
        /// Human-readable explanation.
        message: String,
    },

    /// A batch schedule whose summed concurrency cannot be represented.
    #[error("invalid schedule: {message}")]
    InvalidSchedule {
        /// Human-readable explanation.
        message: String,
    },

    /// Arithmetic state that well-formed input can never reach.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable details for debugging purposes.
        message: String,
    },

    /// A schedule or operation list could not be read from or written to JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RampError {
    /// Creates an `InvalidStage` variant.
    #[must_use]
    pub fn invalid_stage(message: impl Into<String>) -> Self {
        Self::InvalidStage {
            message: message.into(),
        }
    }

    /// Creates an `UnsupportedProfile` variant.
    #[must_use]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedProfile {
            message: message.into(),
        }
    }

    /// Creates an `InvalidState` variant.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates an `InvalidRow` variant.
    #[must_use]
    pub fn invalid_row(message: impl Into<String>) -> Self {
        Self::InvalidRow {
            message: message.into(),
        }
    }

    /// Creates an `InvalidSchedule` variant.
    #[must_use]
    pub fn invalid_schedule(message: impl Into<String>) -> Self {
        Self::InvalidSchedule {
            message: message.into(),
        }
    }

    /// Creates an `Internal` variant.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Short label used for the error metric.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidStage { .. } => "invalid_stage",
            Self::NonLiteralStage { .. } => "non_literal_stage",
            Self::MissingDuration { .. } => "missing_duration",
            Self::UnsupportedProfile { .. } => "unsupported_profile",
            Self::InvalidState { .. } => "invalid_state",
            Self::InvalidRow { .. } => "invalid_row",
            Self::InvalidSchedule { .. } => "invalid_schedule",
            Self::Internal { .. } => "internal",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Convenient result alias for schedule operations.
pub type RampResult<T> = Result<T, RampError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RampError::invalid_stage("thread count must be >= 0, got -1");
        assert_eq!(
            err.to_string(),
            "invalid stage: thread count must be >= 0, got -1"
        );

        let err = RampError::NonLiteralStage { index: 2 };
        assert!(err.to_string().starts_with("stage 2 is not literal"));
        assert_eq!(err.kind(), "non_literal_stage");
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse: Result<u32, _> = serde_json::from_str("not json");
        let err: RampError = parse.unwrap_err().into();
        assert_eq!(err.kind(), "serialization");
    }
}
