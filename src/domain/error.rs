use thiserror::Error;

/// Core domain errors
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Bad input: {message}")]
    BadInput { message: String },

    #[error("Cancelled: {reason}")]
    Cancelled { reason: String },

    #[error("Upstream error: {component} - {message}")]
    Upstream { component: String, message: String },

    #[error("Parse failed: {message}")]
    ParseFailed { message: String },

    #[error("Budget exhausted: {message}")]
    BudgetExhausted { message: String },

    #[error("Max retries exceeded after {attempts} attempts: {source}")]
    MaxRetriesExceeded {
        attempts: u32,
        #[source]
        source: Box<DomainError>,
    },

    #[error("Routing failed: {message}")]
    RoutingFailed { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn bad_input(message: impl Into<String>) -> Self {
        Self::BadInput {
            message: message.into(),
        }
    }

    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    pub fn upstream(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn parse_failed(message: impl Into<String>) -> Self {
        Self::ParseFailed {
            message: message.into(),
        }
    }

    pub fn budget_exhausted(message: impl Into<String>) -> Self {
        Self::BudgetExhausted {
            message: message.into(),
        }
    }

    pub fn max_retries_exceeded(attempts: u32, source: DomainError) -> Self {
        Self::MaxRetriesExceeded {
            attempts,
            source: Box::new(source),
        }
    }

    pub fn routing_failed(message: impl Into<String>) -> Self {
        Self::RoutingFailed {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True when the error came from cancellation or an expired deadline
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled { .. } => true,
            Self::MaxRetriesExceeded { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Errors caused by the caller's input or configuration are never retried
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Cancelled { .. } | Self::InvalidConfig { .. } | Self::BadInput { .. }
        )
    }

    /// Innermost error, unwrapping retry wrappers
    pub fn root_cause(&self) -> &DomainError {
        match self {
            Self::MaxRetriesExceeded { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
