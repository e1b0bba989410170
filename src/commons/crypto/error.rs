use std::fmt;
use std::fmt::Display;

/// Low level errors from key handling, signing and the CMS codec.
///
/// These carry the message of the underlying library error. Callers map
/// them into the enrollment [`Error`](crate::commons::error::Error) taxonomy
/// depending on the step that failed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    KeyError(String),
    SigningError(String),
    EncryptionError(String),
    DecryptionError(String),
    EncodeError(String),
    DecodeError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::KeyError(e) => write!(f, "key error: {}", e),
            Error::SigningError(e) => write!(f, "signing error: {}", e),
            Error::EncryptionError(e) => write!(f, "encryption error: {}", e),
            Error::DecryptionError(e) => write!(f, "decryption error: {}", e),
            Error::EncodeError(e) => write!(f, "encoding error: {}", e),
            Error::DecodeError(e) => write!(f, "decoding error: {}", e),
        }
    }
}

impl Error {
    pub fn key_error(e: impl Display) -> Self {
        Error::KeyError(e.to_string())
    }

    pub fn signing(e: impl Display) -> Self {
        Error::SigningError(e.to_string())
    }

    pub fn encryption(e: impl Display) -> Self {
        Error::EncryptionError(e.to_string())
    }

    pub fn decryption(e: impl Display) -> Self {
        Error::DecryptionError(e.to_string())
    }

    pub fn encode(e: impl Display) -> Self {
        Error::EncodeError(e.to_string())
    }

    pub fn decode(e: impl Display) -> Self {
        Error::DecodeError(e.to_string())
    }
}

impl std::error::Error for Error {}
