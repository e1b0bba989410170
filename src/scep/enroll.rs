//! A complete enrollment attempt.
//!
//! Generates a key, builds the request and the bootstrap identity, fetches
//! the CA certificate, submits the request and interprets the response. The
//! key and bootstrap identity live only as long as the attempt, or the
//! [`EnrollmentReport`] the caller keeps to poll a pending request.
use std::fmt;

use log::{info, warn};
use openssl::x509::X509;

use crate::commons::crypto::cms::{CmsCodec, OpenSslCms};
use crate::commons::crypto::{
    AltNames, BootstrapIdentity, CertificateSigningRequest, DistinguishedName, ExtraExtension, KeyPair,
};
use crate::commons::error::Error;
use crate::commons::ScepResult;
use crate::config::Config;
use crate::constants::{BOOTSTRAP_VALIDITY_DAYS, MIN_RSA_KEY_BITS};
use crate::scep::client::{CaIdentity, ScepClient};
use crate::scep::correlate::{Correlation, CorrelationWarning, TransactionCorrelator};
use crate::scep::interpret::{EnrollmentResult, ResponseInterpreter};
use crate::scep::msg::{PkiHeader, PkiMessage, ScepMessageCodec, ScepRequest};
use crate::scep::types::{MessageType, TransactionId};

//------------ EnrollmentSettings --------------------------------------------

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnrollmentSettings {
    pub key_size: u32,
    pub bootstrap_validity_days: u32,

    /// Refuse responses that are not a CertRep, rather than warn.
    pub strict_message_type: bool,
}

impl Default for EnrollmentSettings {
    fn default() -> Self {
        EnrollmentSettings {
            key_size: MIN_RSA_KEY_BITS,
            bootstrap_validity_days: BOOTSTRAP_VALIDITY_DAYS,
            strict_message_type: false,
        }
    }
}

impl From<&Config> for EnrollmentSettings {
    fn from(config: &Config) -> Self {
        EnrollmentSettings {
            key_size: config.key_size,
            bootstrap_validity_days: config.bootstrap_validity_days,
            strict_message_type: config.strict_message_type,
        }
    }
}

//------------ EnrollmentRequest ---------------------------------------------

/// What to ask the CA for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnrollmentRequest {
    subject: DistinguishedName,
    alt_names: AltNames,
    extensions: Vec<ExtraExtension>,
    renewal: bool,
}

impl EnrollmentRequest {
    pub fn new(subject: DistinguishedName) -> Self {
        EnrollmentRequest {
            subject,
            alt_names: AltNames::default(),
            extensions: vec![],
            renewal: false,
        }
    }

    pub fn with_alt_names(mut self, alt_names: AltNames) -> Self {
        self.alt_names = alt_names;
        self
    }

    pub fn with_extension(mut self, extension: ExtraExtension) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Send a RenewalReq rather than a PKCSReq.
    pub fn renewal(mut self, renewal: bool) -> Self {
        self.renewal = renewal;
        self
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    pub fn alt_names(&self) -> &AltNames {
        &self.alt_names
    }
}

//------------ EnrollmentWarning ---------------------------------------------

/// Something odd about a response that did not stop us from using it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EnrollmentWarning {
    Correlation(CorrelationWarning),
    UnexpectedMessageType(MessageType),

    /// None of the CA certificates or the certificates in the response
    /// produced the response's signature.
    UnverifiedSignature,

    /// The certificates embedded in the response could not be parsed, so
    /// only the CA chain was tried for the signature.
    UnreadableCertificates(String),

    /// The certificate in a SUCCESS response is not for our key.
    CertificateKeyMismatch,
}

impl fmt::Display for EnrollmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EnrollmentWarning::Correlation(warning) => write!(f, "{}", warning),
            EnrollmentWarning::UnexpectedMessageType(message_type) => {
                write!(f, "expected a CertRep response, got {}", message_type)
            }
            EnrollmentWarning::UnverifiedSignature => {
                write!(f, "the response signature could not be verified with any known certificate")
            }
            EnrollmentWarning::UnreadableCertificates(e) => {
                write!(f, "the certificates in the response cannot be read: {}", e)
            }
            EnrollmentWarning::CertificateKeyMismatch => {
                write!(f, "the issued certificate does not match the requested key")
            }
        }
    }
}

//------------ EnrollmentReport ----------------------------------------------

/// The outcome of an attempt, with what the caller needs to act on it.
#[derive(Clone, Debug)]
pub struct EnrollmentReport {
    transaction_id: TransactionId,
    result: EnrollmentResult,
    response: PkiHeader,
    warnings: Vec<EnrollmentWarning>,
    identity: BootstrapIdentity,
    ca: CaIdentity,
}

impl EnrollmentReport {
    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    pub fn result(&self) -> &EnrollmentResult {
        &self.result
    }

    pub fn into_result(self) -> EnrollmentResult {
        self.result
    }

    /// The SCEP attributes of the response, for diagnostics.
    pub fn response(&self) -> &PkiHeader {
        &self.response
    }

    pub fn warnings(&self) -> &[EnrollmentWarning] {
        &self.warnings
    }

    pub fn ca(&self) -> &CaIdentity {
        &self.ca
    }

    /// The key of the attempt. The issued certificate is for this key.
    pub fn key(&self) -> &KeyPair {
        self.identity.key()
    }
}

//------------ Enrollment ----------------------------------------------------

/// Runs enrollment attempts against one CA.
pub struct Enrollment<C = OpenSslCms> {
    client: ScepClient,
    codec: ScepMessageCodec<C>,
    correlator: TransactionCorrelator,
    settings: EnrollmentSettings,
}

impl Enrollment<OpenSslCms> {
    pub fn new(client: ScepClient, settings: EnrollmentSettings) -> Self {
        Self::with_codec(client, ScepMessageCodec::default(), settings)
    }

    pub fn from_config(config: &Config) -> ScepResult<Self> {
        let client = ScepClient::from_config(config)?;
        let codec = ScepMessageCodec::new(OpenSslCms::new(config.envelope_cipher));
        Ok(Self::with_codec(client, codec, EnrollmentSettings::from(config)))
    }
}

impl<C: CmsCodec> Enrollment<C> {
    pub fn with_codec(client: ScepClient, codec: ScepMessageCodec<C>, settings: EnrollmentSettings) -> Self {
        Enrollment {
            client,
            codec,
            correlator: TransactionCorrelator::new(),
            settings,
        }
    }

    pub fn with_correlator(mut self, correlator: TransactionCorrelator) -> Self {
        self.correlator = correlator;
        self
    }

    /// Runs a complete attempt with a fresh key.
    pub async fn enroll(&mut self, request: &EnrollmentRequest) -> ScepResult<EnrollmentReport> {
        let key = KeyPair::generate_with_size(self.settings.key_size)?;
        self.enroll_with(request, key).await
    }

    /// Runs a complete attempt for the given key.
    pub async fn enroll_with(&mut self, request: &EnrollmentRequest, key: KeyPair) -> ScepResult<EnrollmentReport> {
        let csr = CertificateSigningRequest::build(&request.subject, &request.alt_names, &request.extensions, &key)?;
        let identity = BootstrapIdentity::build(&csr, key, self.settings.bootstrap_validity_days)?;
        let ca = self.client.get_ca_certificate().await?;

        let scep_request = if request.renewal {
            ScepRequest::RenewalReq(&csr)
        } else {
            ScepRequest::PkcsReq(&csr)
        };

        let correlation = self.correlator.new_attempt();
        info!(
            "Requesting certificate for {} in transaction {}",
            request.subject,
            correlation.transaction_id()
        );

        self.exchange(&scep_request, identity, ca, correlation).await
    }

    /// Asks once more about a pending request, with a CertPoll in the same
    /// transaction.
    pub async fn poll(&mut self, pending: &EnrollmentReport) -> ScepResult<EnrollmentReport> {
        let correlation = self.correlator.resume(pending.transaction_id.clone());
        info!("Polling for transaction {}", correlation.transaction_id());

        self.exchange(
            &ScepRequest::CertPoll,
            pending.identity.clone(),
            pending.ca.clone(),
            correlation,
        )
        .await
    }

    async fn exchange(
        &self,
        request: &ScepRequest<'_>,
        identity: BootstrapIdentity,
        ca: CaIdentity,
        correlation: Correlation,
    ) -> ScepResult<EnrollmentReport> {
        let message = self
            .codec
            .build_request(request, &identity, ca.certificate(), &correlation)?;
        let raw = self.client.submit(&message).await?;
        let response = self.codec.parse_response(raw)?;

        let mut warnings = vec![];

        if let Err(mismatches) = correlation.verify(response.header()) {
            warnings.extend(mismatches.into_iter().map(EnrollmentWarning::Correlation));
        }

        let message_type = response.header().message_type();
        if message_type != MessageType::CertRep {
            if self.settings.strict_message_type {
                return Err(Error::UnexpectedMessageType(message_type));
            }
            warnings.push(EnrollmentWarning::UnexpectedMessageType(message_type));
        }

        warnings.extend(signer_warnings(&response, ca.chain()));

        let result = ResponseInterpreter::new(&self.codec, &identity).interpret(&response)?;
        if let EnrollmentResult::Issued(issued) = &result {
            if !issued.matches_key() {
                warnings.push(EnrollmentWarning::CertificateKeyMismatch);
            }
        }

        for warning in &warnings {
            warn!("Transaction {}: {}", correlation.transaction_id(), warning);
        }
        info!("Transaction {}: {}", correlation.transaction_id(), result);

        Ok(EnrollmentReport {
            transaction_id: correlation.transaction_id().clone(),
            result,
            response: response.header().clone(),
            warnings,
            identity,
            ca,
        })
    }
}

/// Looks for the signer of a response in the CA chain, then in the
/// certificates the response carries.
fn signer_warnings(response: &PkiMessage, chain: &[X509]) -> Vec<EnrollmentWarning> {
    let mut warnings = vec![];

    let embedded = match response.certificates() {
        Ok(certificates) => certificates,
        Err(e) => {
            warnings.push(EnrollmentWarning::UnreadableCertificates(e.to_string()));
            vec![]
        }
    };

    if response.find_signer(chain.iter().chain(embedded.iter())).is_none() {
        warnings.push(EnrollmentWarning::UnverifiedSignature);
    }
    warnings
}

//------------ Tests ---------------------------------------------------------
