pub mod comment;
pub mod interaction;
pub mod message;
pub mod post;
pub mod user;

/// Failures a caller can act on. Anything else bubbling out of a service is
/// an internal error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("{0}")]
    Invalid(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
}

impl DomainError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }
}

/// Checks a required text field: non-blank and at most `max_chars` characters.
pub fn require_text(value: &str, field: &str, max_chars: usize) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::invalid(format!("{} is required", field)));
    }
    if value.chars().count() > max_chars {
        return Err(DomainError::invalid(format!(
            "{} must be at most {} characters",
            field, max_chars
        )));
    }
    Ok(())
}
