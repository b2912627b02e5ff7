//! Error types with categorical codes.

use thiserror::Error;

/// Errors raised by notifier collaborators.
///
/// The reconciliation core never propagates these: a failed platform call is
/// logged and the offending event is dropped.
#[derive(Debug, Error)]
pub enum NotifierError {
    /// Notification service rejected a call (NOTIFY001)
    #[error("Notification service error: {0}")]
    Notification(String),

    /// Live notification registry could not be read or written (NOTIFY002)
    #[error("Notification registry error: {0}")]
    Registry(String),

    /// Serialization error (NOTIFY003)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (NOTIFY004)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NotifierError {
    /// Returns the categorical error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Notification(_) => "NOTIFY001",
            Self::Registry(_) => "NOTIFY002",
            Self::Serialization(_) => "NOTIFY003",
            Self::Io(_) => "NOTIFY004",
        }
    }
}

/// Result type alias for notifier operations.
pub type Result<T> = std::result::Result<T, NotifierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            NotifierError::Notification(String::new()),
            NotifierError::Registry(String::new()),
            serde_json::from_str::<u32>("x").unwrap_err().into(),
            std::io::Error::new(std::io::ErrorKind::Other, "io").into(),
        ];
        let mut codes: Vec<_> = errors.iter().map(NotifierError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_io_error_conversion() {
        let err: NotifierError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.code(), "NOTIFY004");
        assert!(err.to_string().contains("gone"));
    }
}
