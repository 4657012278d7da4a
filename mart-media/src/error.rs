use thiserror::Error;

/// Result type for media operations
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while talking to media storage
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Invalid media request: {message}")]
    Invalid { message: String },

    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("Delete failed: {reason}")]
    DeleteFailed { reason: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl MediaError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create an invalid request error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create an upload failed error
    pub fn upload_failed<S: Into<String>>(reason: S) -> Self {
        Self::UploadFailed {
            reason: reason.into(),
        }
    }

    /// Create a delete failed error
    pub fn delete_failed<S: Into<String>>(reason: S) -> Self {
        Self::DeleteFailed {
            reason: reason.into(),
        }
    }
}
