use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::recommendation::RecommendationId;
use crate::generator::GenerationError;
use crate::overlay::OverlayError;
use crate::query::QueryError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("recommendation id {0} appears more than once")]
    DuplicateRecommendation(RecommendationId),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Overlay(#[from] OverlayError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ApplicationError {
    /// Stable machine-readable class for envelopes and logs.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "config_validation",
            Self::Generation(_) | Self::Domain(_) => "generation",
            Self::Overlay(_) | Self::Query(_) | Self::InvalidInput(_) => "invalid_input",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Generation(_) | Self::Domain(_) => 3,
            Self::Overlay(_) | Self::Query(_) | Self::InvalidInput(_) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApplicationError, DomainError};
    use crate::config::ConfigError;
    use crate::domain::recommendation::RecommendationId;
    use crate::query::QueryError;

    #[test]
    fn error_classes_map_to_exit_codes() {
        let config: ApplicationError = ConfigError::Validation("bad".to_owned()).into();
        assert_eq!((config.error_class(), config.exit_code()), ("config_validation", 2));

        let domain: ApplicationError =
            DomainError::DuplicateRecommendation(RecommendationId(4)).into();
        assert_eq!((domain.error_class(), domain.exit_code()), ("generation", 3));
        assert_eq!(domain.to_string(), "recommendation id 4 appears more than once");

        let query: ApplicationError = QueryError::ZeroPage.into();
        assert_eq!((query.error_class(), query.exit_code()), ("invalid_input", 4));
    }
}
