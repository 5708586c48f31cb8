use thiserror::Error;

/// Every failure a session command can produce.
///
/// Validation failures carry the exact message shown to the user; the other
/// variants are prefixed with the failing action when surfaced.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Upstream(String),

    #[error("database error")]
    Persistence(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// The message a session records after `action` failed with this error.
    #[must_use]
    pub fn user_message(&self, action: &str) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Persistence(err) => {
                tracing::error!(error = %err, action, "database operation failed");
                format!("Failed to {action}: database error")
            }
            other => format!("Failed to {action}: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_is_verbatim() {
        let err = AppError::validation("Title is required");
        assert_eq!(err.user_message("add todo"), "Title is required");
    }

    #[test]
    fn upstream_message_is_prefixed() {
        let err = AppError::upstream("HTTP 404 Not Found");
        assert_eq!(
            err.user_message("fetch weather"),
            "Failed to fetch weather: HTTP 404 Not Found"
        );
    }

    #[test]
    fn persistence_message_hides_cause() {
        let err = AppError::from(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(
            err.user_message("load todos"),
            "Failed to load todos: database error"
        );
    }
}
