//! Hook errors

use thiserror::Error;

/// Errors from collaborators
#[derive(Debug, Error)]
pub enum HookError {
    #[error("Validator failed: {0}")]
    Validator(String),

    #[error("Hook timeout after {0}ms")]
    Timeout(u64),

    #[error("External service error: {0}")]
    ExternalService(String),
}

/// Result type for hook operations
pub type HookResult<T> = Result<T, HookError>;

impl HookError {
    /// Create an external service error
    pub fn external(message: impl Into<String>) -> Self {
        HookError::ExternalService(message.into())
    }
}
