//! Error types for native functions

/// Result type for native calls
pub type NativeResult<T> = Result<T, NativeError>;

/// Errors raised by (or while calling) a native function
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NativeError {
    /// Type mismatch during conversion
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// Invalid argument
    #[error("Argument error: {0}")]
    ArgumentError(String),

    /// Function panicked
    #[error("Function panicked: {0}")]
    Panic(String),

    /// The function ran and reported a failure
    #[error("{0}")]
    Failed(String),
}

impl From<String> for NativeError {
    fn from(s: String) -> Self {
        NativeError::Failed(s)
    }
}

impl From<&str> for NativeError {
    fn from(s: &str) -> Self {
        NativeError::Failed(s.to_string())
    }
}
