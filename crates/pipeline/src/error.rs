use thiserror::Error;

/// Errors reported by a [`NotificationSink`](crate::NotificationSink).
///
/// The worker logs and drops the chunk on any of these; none is retried.
#[derive(Debug, Error)]
pub enum Error {
    /// The endpoint answered with a non-success status.
    #[error("sink rejected notification: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("{message}")]
    Message { message: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
