//! Error taxonomy shared by the reader, writer and lookahead buffer.

use ion_buffers::BufferError;

/// Ion codec error.
///
/// `Format`, `Truncated` and `IntegerOverflow` are fatal for the stream
/// position they occur at. `Usage` signals a caller bug. `ResourceLimit` is
/// raised only when no oversized-value policy is registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IonError {
    #[error("format error at byte {position}: {message}")]
    Format { message: String, position: u64 },
    #[error("unexpected end of input at byte {position}")]
    Truncated { position: u64 },
    #[error("variable-length integer overflow at byte {position}")]
    IntegerOverflow { position: u64 },
    #[error("usage error: {0}")]
    Usage(String),
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),
    #[error("i/o error: {0}")]
    Io(String),
}

pub type IonResult<T> = Result<T, IonError>;

impl IonError {
    pub(crate) fn format(message: impl Into<String>, position: u64) -> Self {
        IonError::Format {
            message: message.into(),
            position,
        }
    }

    pub(crate) fn usage(message: impl Into<String>) -> Self {
        IonError::Usage(message.into())
    }

    /// True for errors caused by running out of input.
    pub fn is_truncated(&self) -> bool {
        matches!(self, IonError::Truncated { .. })
    }
}

impl From<std::io::Error> for IonError {
    fn from(err: std::io::Error) -> Self {
        IonError::Io(err.to_string())
    }
}

impl From<BufferError> for IonError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::CapacityExceeded => IonError::ResourceLimit(err.to_string()),
            _ => IonError::Io(err.to_string()),
        }
    }
}
