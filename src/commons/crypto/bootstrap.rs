//! The self-signed identity used to sign and receive the first request.
//!
//! Before the CA has issued anything, the client still has to sign its
//! request and give the CA a certificate to encrypt the response to. We
//! make up a tiny hierarchy for that: a self-signed issuer, and a leaf below
//! it that carries the subject of the request. Both use the key of the
//! enrollment attempt.
use std::fmt;

use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::{BigNum, MsbOption};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectKeyIdentifier,
};
use openssl::x509::{X509, X509Builder, X509Name, X509Ref};

use crate::commons::crypto::csr::CertificateSigningRequest;
use crate::commons::crypto::keys::KeyPair;
use crate::commons::error::Error;
use crate::constants::BOOTSTRAP_MAX_VALIDITY_DAYS;

//------------ BootstrapIdentity ---------------------------------------------

#[derive(Clone)]
pub struct BootstrapIdentity {
    issuer: X509,
    certificate: X509,
    key: KeyPair,
}

impl BootstrapIdentity {
    /// Builds the bootstrap certificates for a request.
    ///
    /// The validity must be between 1 day and 10 years.
    pub fn build(csr: &CertificateSigningRequest, key: KeyPair, validity_days: u32) -> Result<Self, Error> {
        if validity_days == 0 || validity_days > BOOTSTRAP_MAX_VALIDITY_DAYS {
            return Err(Error::CertificateConstruction(format!(
                "bootstrap validity of {} days is outside 1..={}",
                validity_days, BOOTSTRAP_MAX_VALIDITY_DAYS
            )));
        }

        let issuer = Self::make_issuer(csr, &key, validity_days).map_err(Error::certificate)?;
        let certificate = Self::make_leaf(csr, &issuer, &key, validity_days).map_err(Error::certificate)?;

        Ok(BootstrapIdentity {
            issuer,
            certificate,
            key,
        })
    }

    /// The self-signed issuer: CA:true, digitalSignature and keyCertSign.
    fn make_issuer(csr: &CertificateSigningRequest, key: &KeyPair, validity_days: u32) -> Result<X509, ErrorStack> {
        let name = csr.subject().to_x509_name()?;
        let mut builder = Self::builder(&name, &name, key, validity_days)?;

        builder.append_extension(BasicConstraints::new().critical().ca().build()?)?;
        builder.append_extension(KeyUsage::new().critical().digital_signature().key_cert_sign().build()?)?;
        builder.append_extension(ExtendedKeyUsage::new().client_auth().server_auth().build()?)?;
        let ski = SubjectKeyIdentifier::new().build(&builder.x509v3_context(None, None))?;
        builder.append_extension(ski)?;

        builder.sign(key.pkey(), MessageDigest::sha256())?;
        Ok(builder.build())
    }

    /// The leaf: subject, names and addresses of the request, usable for
    /// TLS client and server authentication.
    fn make_leaf(
        csr: &CertificateSigningRequest,
        issuer: &X509Ref,
        key: &KeyPair,
        validity_days: u32,
    ) -> Result<X509, ErrorStack> {
        let subject = csr.subject().to_x509_name()?;
        let mut builder = Self::builder(issuer.subject_name(), &subject, key, validity_days)?;

        builder.append_extension(BasicConstraints::new().critical().build()?)?;
        builder.append_extension(KeyUsage::new().critical().digital_signature().key_encipherment().build()?)?;
        builder.append_extension(ExtendedKeyUsage::new().client_auth().server_auth().build()?)?;
        let ski = SubjectKeyIdentifier::new().build(&builder.x509v3_context(Some(issuer), None))?;
        builder.append_extension(ski)?;
        let aki = AuthorityKeyIdentifier::new()
            .keyid(false)
            .build(&builder.x509v3_context(Some(issuer), None))?;
        builder.append_extension(aki)?;
        let san = csr.alt_names().to_extension(&builder.x509v3_context(Some(issuer), None))?;
        if let Some(san) = san {
            builder.append_extension(san)?;
        }

        builder.sign(key.pkey(), MessageDigest::sha256())?;
        Ok(builder.build())
    }

    fn builder(
        issuer: &openssl::x509::X509NameRef,
        subject: &X509Name,
        key: &KeyPair,
        validity_days: u32,
    ) -> Result<X509Builder, ErrorStack> {
        let mut builder = X509Builder::new()?;
        builder.set_version(2)?;
        let value = random_serial()?;
        builder.set_serial_number(&value)?;
        builder.set_issuer_name(issuer)?;
        builder.set_subject_name(subject)?;
        builder.set_pubkey(key.pkey())?;
        let value = Asn1Time::days_from_now(0)?;
        builder.set_not_before(&value)?;
        let value = Asn1Time::days_from_now(validity_days)?;
        builder.set_not_after(&value)?;
        Ok(builder)
    }
}

/// # Accessors
///
impl BootstrapIdentity {
    /// The leaf certificate that signs requests and receives responses.
    pub fn certificate(&self) -> &X509 {
        &self.certificate
    }

    pub fn issuer(&self) -> &X509 {
        &self.issuer
    }

    pub fn key(&self) -> &KeyPair {
        &self.key
    }

    pub fn into_key(self) -> KeyPair {
        self.key
    }
}

impl fmt::Debug for BootstrapIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BootstrapIdentity")
            .field("issuer", &self.issuer.subject_name())
            .field("certificate", &self.certificate.subject_name())
            .field("key", &self.key)
            .finish()
    }
}

/// Returns a random positive 64 bit serial number.
fn random_serial() -> Result<Asn1Integer, ErrorStack> {
    let mut serial = BigNum::new()?;
    serial.rand(64, MsbOption::MAYBE_ZERO, false)?;
    serial.to_asn1_integer()
}

//------------ Tests ---------------------------------------------------------
