//! Transaction ids and nonces, and checking that a response belongs to the
//! request that caused it.
use std::fmt;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::scep::msg::PkiHeader;
use crate::scep::types::{Nonce, TransactionId};

//------------ TransactionCorrelator -----------------------------------------

/// Hands out transaction ids and sender nonces.
///
/// The random source is explicit so that tests can use a seeded one.
pub struct TransactionCorrelator<R = StdRng> {
    rng: R,
}

impl TransactionCorrelator<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl Default for TransactionCorrelator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore> TransactionCorrelator<R> {
    pub fn with_rng(rng: R) -> Self {
        TransactionCorrelator { rng }
    }

    /// A fresh transaction id and sender nonce for a new attempt.
    pub fn new_attempt(&mut self) -> Correlation {
        let transaction_id = TransactionId::random(&mut self.rng);
        self.resume(transaction_id)
    }

    /// A fresh sender nonce for another message in an existing transaction.
    pub fn resume(&mut self, transaction_id: TransactionId) -> Correlation {
        Correlation {
            transaction_id,
            sender_nonce: Nonce::random(&mut self.rng),
        }
    }
}

//------------ Correlation ---------------------------------------------------

/// What we sent, to compare the response against.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Correlation {
    transaction_id: TransactionId,
    sender_nonce: Nonce,
}

impl Correlation {
    pub fn new(transaction_id: TransactionId, sender_nonce: Nonce) -> Self {
        Correlation {
            transaction_id,
            sender_nonce,
        }
    }

    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    pub fn sender_nonce(&self) -> &Nonce {
        &self.sender_nonce
    }

    /// Checks that the response echoes our transaction id and nonce.
    ///
    /// A mismatch is reported, not enforced: whether the certificate was
    /// issued is up to the CA's status.
    pub fn verify(&self, response: &PkiHeader) -> Result<(), Vec<CorrelationWarning>> {
        let mut warnings = vec![];

        if response.transaction_id() != Some(&self.transaction_id) {
            warnings.push(CorrelationWarning::TransactionIdMismatch {
                sent: self.transaction_id.clone(),
                received: response.transaction_id().cloned(),
            });
        }

        if response.recipient_nonce() != Some(&self.sender_nonce) {
            warnings.push(CorrelationWarning::NonceMismatch {
                sent: self.sender_nonce.clone(),
                received: response.recipient_nonce().cloned(),
            });
        }

        if warnings.is_empty() {
            Ok(())
        } else {
            Err(warnings)
        }
    }
}

//------------ CorrelationWarning --------------------------------------------

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CorrelationWarning {
    TransactionIdMismatch {
        sent: TransactionId,
        received: Option<TransactionId>,
    },
    NonceMismatch {
        sent: Nonce,
        received: Option<Nonce>,
    },
}

impl fmt::Display for CorrelationWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CorrelationWarning::TransactionIdMismatch { sent, received } => match received {
                Some(received) => write!(
                    f,
                    "transaction id mismatch: sent '{}', received '{}'",
                    sent, received
                ),
                None => write!(f, "response has no transaction id, sent '{}'", sent),
            },
            CorrelationWarning::NonceMismatch { sent, received } => match received {
                Some(received) => write!(
                    f,
                    "recipient nonce {} does not match sender nonce {}",
                    received, sent
                ),
                None => write!(f, "response has no recipient nonce, sent nonce {}", sent),
            },
        }
    }
}

//------------ Tests ---------------------------------------------------------
