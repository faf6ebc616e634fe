/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for tiercache operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller supplied an argument the cache cannot work with
    #[error("invalid argument '{argument}': {message}")]
    InvalidArgument {
        argument: &'static str,
        message: String,
    },

    /// Configuration errors, raised while a configuration is being built
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A cache handle's backing store failed
    #[error("cache handle '{handle}' failed during {operation}: {message}")]
    Handle {
        handle: String,
        operation: &'static str,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Backplane publish/subscribe failures
    #[error("backplane '{backplane}' error: {message}")]
    Backplane { backplane: String, message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

// Helper methods for creating errors with context
impl Error {
    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(argument: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            argument,
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a handle failure without an underlying source
    #[must_use]
    pub fn handle(
        handle: impl Into<String>,
        operation: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Error::Handle {
            handle: handle.into(),
            operation,
            message: message.into(),
            source: None,
        }
    }

    /// Create a handle failure wrapping the backend's own error
    #[must_use]
    pub fn handle_with_source(
        handle: impl Into<String>,
        operation: &'static str,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Handle {
            handle: handle.into(),
            operation,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a backplane error
    #[must_use]
    pub fn backplane(backplane: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Backplane {
            backplane: backplane.into(),
            message: message.into(),
        }
    }

    /// Whether the error was raised by argument validation
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument { .. })
    }
}
