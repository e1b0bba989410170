//! RSA key material for a single enrollment attempt.
use std::fmt;

use bytes::Bytes;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::rsa::Rsa;
use openssl::x509::X509Ref;

use crate::commons::error::Error;
use crate::constants::MIN_RSA_KEY_BITS;

//------------ KeyPair -------------------------------------------------------

/// An openssl based RSA key pair.
///
/// The key lives in memory only. OpenSSL clears the private key's big
/// numbers when the last reference to it is dropped.
#[derive(Clone)]
pub struct KeyPair {
    pkey: PKey<Private>,
}

impl KeyPair {
    /// Generates a fresh 2048 bit RSA key pair.
    pub fn generate() -> Result<Self, Error> {
        Self::generate_with_size(MIN_RSA_KEY_BITS)
    }

    /// Generates a fresh RSA key pair with the given modulus size.
    ///
    /// Sizes below 2048 bits are refused.
    pub fn generate_with_size(bits: u32) -> Result<Self, Error> {
        if bits < MIN_RSA_KEY_BITS {
            return Err(Error::KeyGeneration(format!(
                "key size {} is too small, must be at least {}",
                bits, MIN_RSA_KEY_BITS
            )));
        }
        let rsa = Rsa::generate(bits).map_err(Error::key_generation)?;
        let pkey = PKey::from_rsa(rsa).map_err(Error::key_generation)?;
        Ok(KeyPair { pkey })
    }

    pub fn pkey(&self) -> &PKeyRef<Private> {
        &self.pkey
    }

    pub fn bits(&self) -> u32 {
        self.pkey.bits()
    }

    /// Returns the DER encoded SubjectPublicKeyInfo.
    pub fn public_key_der(&self) -> Result<Bytes, Error> {
        self.pkey.public_key_to_der().map(Bytes::from).map_err(Error::key_generation)
    }

    /// Returns the private key as a PKCS#8 PEM document.
    ///
    /// The library never writes this anywhere. It is there for callers who
    /// decide to keep the key next to the issued certificate.
    pub fn private_key_pem(&self) -> Result<Vec<u8>, Error> {
        self.pkey.private_key_to_pem_pkcs8().map_err(Error::key_generation)
    }

    /// Returns whether the certificate certifies our public key.
    pub fn matches(&self, cert: &X509Ref) -> bool {
        match cert.public_key() {
            Ok(key) => key.public_eq(self.pkey()),
            Err(_) => false,
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "KeyPair(RSA {} bits)", self.bits())
    }
}

//------------ Tests ---------------------------------------------------------
