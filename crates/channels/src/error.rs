use std::error::Error as StdError;

/// Crate-wide result type for source adapter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed errors shared by source adapters.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Adapter configuration is unusable (missing token, bad URL, ...).
    #[error("invalid adapter config: {message}")]
    InvalidConfig { message: String },

    /// The upstream source answered with something we cannot use.
    #[error("unexpected source response: {message}")]
    Protocol { message: String },

    /// Wrapped transport error from an external dependency.
    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_config(message: impl std::fmt::Display) -> Self {
        Self::InvalidConfig {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn protocol(message: impl std::fmt::Display) -> Self {
        Self::Protocol {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
