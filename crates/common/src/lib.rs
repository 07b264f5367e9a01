//! Common types and utilities for the token generator

/// Error type for token generator operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Generic error with message
    #[error("{0}")]
    Generic(String),

    /// A caller passed an argument that violates the operation's contract
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Request data failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Requested contract, artifact or job does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists or is in a state that forbids the operation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Hardhat invocation failed
    #[error("Hardhat error ({cause}): {message}")]
    Hardhat {
        /// Which hardhat task failed (compile, verify, ...)
        cause: String,
        /// Captured stderr or failure description
        message: String,
    },

    /// Job queue error
    #[error("Job error: {0}")]
    Job(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new generic error
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }

    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a new not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create a new conflict error
    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        Error::Conflict(msg.into())
    }

    /// Create a new IO error
    pub fn io<S: Into<String>>(msg: S) -> Self {
        Error::Io(msg.into())
    }

    /// Create a new serialization error
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Error::Serialization(msg.into())
    }

    /// Create a new hardhat error
    pub fn hardhat<C: Into<String>, S: Into<String>>(cause: C, msg: S) -> Self {
        Error::Hardhat {
            cause: cause.into(),
            message: msg.into(),
        }
    }

    /// Create a new job error
    pub fn job<S: Into<String>>(msg: S) -> Self {
        Error::Job(msg.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// True when the error means the addressed resource is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON serialization error: {}", err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardhat_error_display() {
        let err = Error::hardhat("compile", "HH600: Compilation failed");
        assert_eq!(err.to_string(), "Hardhat error (compile): HH600: Compilation failed");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_not_found());
    }
}
