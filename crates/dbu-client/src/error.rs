use thiserror::Error;

/// Errors a [`crate::DatabaseApi`] call can return.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The user (or its database) does not exist remotely.
    #[error("not found")]
    NotFound,

    /// Network or transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("provider api error status={status}: {message}")]
    Api { status: u16, message: String },

    /// A response payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The caller cancelled the operation while the call was pending.
    #[error("cancelled by caller")]
    Cancelled,

    /// The caller's deadline passed while the call was pending.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound)
    }

    /// True for caller-initiated stops (cancellation or deadline).
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled | ClientError::DeadlineExceeded)
    }
}
