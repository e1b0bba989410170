//! Defines all errors an enrollment attempt can end in.

use std::fmt::Display;
use std::{fmt, io};

use crate::commons::crypto;
use crate::commons::util::httpclient;
use crate::scep::interpret::Rejection;
use crate::scep::types::MessageType;

//------------ Error ---------------------------------------------------------

/// Errors that abort an enrollment attempt.
///
/// None of these leave any state behind: a caller who wants to retry starts
/// a new attempt with a new key, transaction id and nonce.
#[derive(Debug)]
pub enum Error {
    // The key pair could not be generated.
    KeyGeneration(String),

    // The PKCS#10 request could not be encoded or signed.
    CsrConstruction(String),

    // The bootstrap certificate could not be built or signed.
    CertificateConstruction(String),

    // The outgoing PKI message could not be signed or encrypted.
    EnvelopeConstruction(String),

    // The CA could not be reached, or did not answer with 200 OK.
    Transport(httpclient::Error),

    // The CA did not deliver a usable CA certificate.
    CaCertificateUnavailable(String),

    // Bytes received from the CA could not be decoded.
    MalformedMessage(String),

    // The CA said SUCCESS but the response does not hold a certificate.
    Enrollment(String),

    // The CA said FAILURE.
    Rejected(Rejection),

    // Only in strict mode: the response was not a CertRep.
    UnexpectedMessageType(MessageType),

    Io(IoError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::KeyGeneration(e) => write!(f, "Cannot generate key pair: {}", e),
            Error::CsrConstruction(e) => write!(f, "Cannot build certificate signing request: {}", e),
            Error::CertificateConstruction(e) => write!(f, "Cannot build bootstrap certificate: {}", e),
            Error::EnvelopeConstruction(e) => write!(f, "Cannot build PKI message: {}", e),
            Error::Transport(e) => e.fmt(f),
            Error::CaCertificateUnavailable(e) => write!(f, "No usable CA certificate: {}", e),
            Error::MalformedMessage(e) => write!(f, "Malformed PKI message from CA: {}", e),
            Error::Enrollment(e) => write!(f, "Enrollment failed: {}", e),
            Error::Rejected(rejection) => write!(f, "Certificate issue failed: {}", rejection),
            Error::UnexpectedMessageType(t) => {
                write!(f, "Received unexpected message type {} from CA, expected CertRep", t)
            }
            Error::Io(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn key_generation(e: impl Display) -> Self {
        Error::KeyGeneration(e.to_string())
    }

    pub fn csr(e: impl Display) -> Self {
        Error::CsrConstruction(e.to_string())
    }

    pub fn certificate(e: impl Display) -> Self {
        Error::CertificateConstruction(e.to_string())
    }

    pub fn envelope(e: impl Display) -> Self {
        Error::EnvelopeConstruction(e.to_string())
    }

    pub fn ca_certificate(e: impl Display) -> Self {
        Error::CaCertificateUnavailable(e.to_string())
    }

    pub fn malformed(e: impl Display) -> Self {
        Error::MalformedMessage(e.to_string())
    }

    pub fn enrollment(e: impl Display) -> Self {
        Error::Enrollment(e.to_string())
    }

    /// Returns the HTTP status code if the CA answered with an error status.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::Transport(e) => e.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

impl From<httpclient::Error> for Error {
    fn from(e: httpclient::Error) -> Self {
        Error::Transport(e)
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Error::Io(e)
    }
}

impl From<crypto::Error> for Error {
    fn from(e: crypto::Error) -> Self {
        // Without context about the step, a crypto problem on our side
        // is an envelope issue and a decode problem means bad input.
        match e {
            crypto::Error::DecodeError(msg) | crypto::Error::DecryptionError(msg) => Error::MalformedMessage(msg),
            other => Error::EnvelopeConstruction(other.to_string()),
        }
    }
}

//------------ IoError -------------------------------------------------------

/// An I/O error together with what we were trying to do.
#[derive(Debug)]
pub struct IoError {
    context: String,
    cause: io::Error,
}

impl IoError {
    pub fn new(context: impl Into<String>, cause: io::Error) -> Self {
        IoError {
            context: context.into(),
            cause,
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.cause)
    }
}

impl std::error::Error for IoError {}

//------------ Tests ---------------------------------------------------------
