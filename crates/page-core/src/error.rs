use thiserror::Error;

pub type PageResult<T> = Result<T, PageError>;

/// Coarse classification of a [`PageError`].
///
/// Callers branch on the kind, never on the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The API was called incorrectly; nothing cryptographic was attempted.
    Usage,
    /// The message or a stanza is not canonical wire syntax.
    Format,
    /// No supplied identity or passphrase unwrapped any stanza.
    KeyRecovery,
    /// The header MAC or a payload chunk failed authentication.
    Integrity,
}

#[derive(Debug, Error)]
pub enum PageError {
    #[error("usage error: {0}")]
    Usage(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("header format error: {0}")]
    Format(String),

    #[error("unknown message format version")]
    UnknownFormat,

    #[error("scrypt work factor 2^{required} exceeds the permitted maximum 2^{max}")]
    ExcessiveWork { required: u8, max: u8 },

    /// Carries no detail about which stanza or identity was tried.
    #[error("no matching keys found")]
    NoMatchingKeys,

    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("cryptographic primitive failed: {0}")]
    Primitive(String),
}

impl PageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PageError::Usage(_) | PageError::InvalidKey(_) => ErrorKind::Usage,
            PageError::Format(_) | PageError::UnknownFormat | PageError::ExcessiveWork { .. } => {
                ErrorKind::Format
            }
            PageError::NoMatchingKeys => ErrorKind::KeyRecovery,
            PageError::Integrity(_) | PageError::Primitive(_) => ErrorKind::Integrity,
        }
    }
}
