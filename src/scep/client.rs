//! The two SCEP HTTP operations.
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use log::{debug, info};
use openssl::x509::{X509, X509NameRef};
use url::Url;

use crate::commons::crypto::cms::SignedContent;
use crate::commons::error::Error;
use crate::commons::util::httpclient;
use crate::commons::ScepResult;
use crate::config::Config;
use crate::constants::{
    CA_RA_CERT_DEFAULT_INDEX, CONTENT_TYPE_CA_CERT, CONTENT_TYPE_CA_RA_CERT, CONTENT_TYPE_PKI_MESSAGE,
    HTTP_CLIENT_TIMEOUT_SECS, SCEP_DEFAULT_ENROLLMENT_PATH, SCEP_OP_GET_CA_CERT, SCEP_OP_PKI_OPERATION,
};
use crate::scep::msg::PkiMessage;

//------------ CaIdentity ----------------------------------------------------

/// The CA certificate to encrypt requests to, and everything GetCACert
/// returned alongside it.
#[derive(Clone, Debug)]
pub struct CaIdentity {
    certificate: X509,
    chain: Vec<X509>,
}

impl CaIdentity {
    pub fn new(certificate: X509, chain: Vec<X509>) -> Self {
        CaIdentity { certificate, chain }
    }

    pub fn certificate(&self) -> &X509 {
        &self.certificate
    }

    /// All certificates received, in order. Holds just the CA certificate if
    /// the CA sent a single one.
    pub fn chain(&self) -> &[X509] {
        &self.chain
    }
}

//------------ ScepClient ----------------------------------------------------

/// Talks to the SCEP service of one CA.
///
/// Each call is a single stateless HTTP exchange, nothing is retried.
#[derive(Clone, Debug)]
pub struct ScepClient {
    endpoint: Url,
    timeout: Duration,
    ca_cert_index: usize,
}

impl ScepClient {
    /// Creates a client for the SCEP service below the given base URL.
    pub fn new(server: &str) -> ScepResult<Self> {
        Self::build(server, SCEP_DEFAULT_ENROLLMENT_PATH)
    }

    pub fn from_config(config: &Config) -> ScepResult<Self> {
        Ok(Self::build(&config.server, &config.enrollment_path)?
            .with_timeout(Duration::from_secs(config.timeout_secs))
            .with_ca_cert_index(config.ca_cert_index))
    }

    fn build(server: &str, enrollment_path: &str) -> ScepResult<Self> {
        let mut base = Url::parse(server).map_err(|e| httpclient::Error::request_build(server, e))?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(httpclient::Error::request_build(server, "only http and https are supported").into());
        }
        if base.cannot_be_a_base() {
            return Err(httpclient::Error::request_build(server, "not a base URL").into());
        }

        // Make the base a directory so that joining appends to it.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.set_query(None);

        let endpoint = base
            .join(enrollment_path.trim_start_matches('/'))
            .map_err(|e| httpclient::Error::request_build(server, e))?;

        Ok(ScepClient {
            endpoint,
            timeout: Duration::from_secs(HTTP_CLIENT_TIMEOUT_SECS),
            ca_cert_index: CA_RA_CERT_DEFAULT_INDEX,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets which certificate of a CA/RA chain to encrypt requests to.
    pub fn with_ca_cert_index(mut self, index: usize) -> Self {
        self.ca_cert_index = index;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn operation_uri(&self, operation: &str) -> String {
        let mut uri = self.endpoint.clone();
        uri.query_pairs_mut().append_pair("operation", operation);
        uri.to_string()
    }
}

/// # Operations
///
impl ScepClient {
    /// Fetches the CA certificate with GetCACert.
    ///
    /// A single DER certificate is used as is. From a CA/RA chain the
    /// certificate at the configured index is used, by default the second
    /// one. The first is commonly the RA's signing certificate. This is a
    /// vendor convention, SCEP itself does not say which one to use.
    pub async fn get_ca_certificate(&self) -> ScepResult<CaIdentity> {
        let uri = self.operation_uri(SCEP_OP_GET_CA_CERT);
        debug!("Fetching CA certificate from {}", uri);

        let res = httpclient::get_binary(&uri, self.timeout).await?;

        let identity = match res.content_type() {
            Some(CONTENT_TYPE_CA_CERT) => {
                let certificate = X509::from_der(res.body())
                    .map_err(|e| Error::malformed(format!("invalid CA certificate: {}", e)))?;
                CaIdentity::new(certificate.clone(), vec![certificate])
            }
            Some(CONTENT_TYPE_CA_RA_CERT) => {
                let chain = SignedContent::decode(res.body())
                    .and_then(|signed| signed.x509_certificates())
                    .map_err(Error::malformed)?;
                let certificate = chain.get(self.ca_cert_index).cloned().ok_or_else(|| {
                    Error::ca_certificate(format!(
                        "CA/RA chain has {} certificate(s), need the one at index {}",
                        chain.len(),
                        self.ca_cert_index
                    ))
                })?;
                CaIdentity::new(certificate, chain)
            }
            other => return Err(httpclient::Error::unexpected_content_type(&uri, other).into()),
        };

        for (idx, cert) in identity.chain().iter().enumerate() {
            info!(
                "CA certificate {}: subject: {}, issuer: {}",
                idx,
                NameDisplay(cert.subject_name()),
                NameDisplay(cert.issuer_name())
            );
        }

        Ok(identity)
    }

    /// Posts a PKI message with PKIOperation and returns the response body.
    pub async fn submit(&self, message: &PkiMessage) -> ScepResult<Bytes> {
        let uri = self.operation_uri(SCEP_OP_PKI_OPERATION);
        debug!(
            "Submitting {} for transaction {} to {}",
            message.header().message_type(),
            message
                .header()
                .transaction_id()
                .map(|id| id.to_string())
                .unwrap_or_default(),
            uri
        );

        let res = httpclient::post_binary(&uri, message.raw(), CONTENT_TYPE_PKI_MESSAGE, self.timeout).await?;
        if res.content_type() != Some(CONTENT_TYPE_PKI_MESSAGE) {
            debug!(
                "Response from {} has content type {}, decoding it anyway",
                uri,
                res.content_type().unwrap_or("<none>")
            );
        }
        Ok(res.into_body())
    }
}

//------------ NameDisplay ---------------------------------------------------

/// Shows an X.509 name as comma separated `short=value` pairs.
struct NameDisplay<'a>(&'a X509NameRef);

impl fmt::Display for NameDisplay<'_> {
    #[allow(deprecated)]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for entry in self.0.entries() {
            let key = entry.object().nid().short_name().unwrap_or("?");
            let value = entry
                .data()
                .as_utf8()
                .map(|value| value.to_string())
                .unwrap_or_else(|_| "?".to_string());
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", key, value)?;
            first = false;
        }
        Ok(())
    }
}

//------------ Tests ---------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_uris() {
        let client = ScepClient::new("https://ca.testcorp.com").unwrap();
        assert_eq!(
            client.operation_uri(SCEP_OP_GET_CA_CERT),
            "https://ca.testcorp.com/certsrv/mscep/?operation=GetCACert"
        );
        assert_eq!(
            client.operation_uri(SCEP_OP_PKI_OPERATION),
            "https://ca.testcorp.com/certsrv/mscep/?operation=PKIOperation"
        );
    }

    #[test]
    fn enrollment_path_is_appended_to_base_path() {
        let client = ScepClient::build("http://localhost:8080/pki", "/cgi-bin/pkiclient.exe").unwrap();
        assert_eq!(
            client.operation_uri(SCEP_OP_GET_CA_CERT),
            "http://localhost:8080/pki/cgi-bin/pkiclient.exe?operation=GetCACert"
        );

        let client = ScepClient::build("http://localhost:8080/scep/", "").unwrap();
        assert_eq!(
            client.operation_uri(SCEP_OP_PKI_OPERATION),
            "http://localhost:8080/scep/?operation=PKIOperation"
        );
    }

    #[test]
    fn certificate_names_are_shown_as_pairs() {
        let ca = crate::test::CaStub::new();
        let subject = NameDisplay(ca.certificate().subject_name()).to_string();
        assert_eq!(subject, "CN=Test SCEP CA, O=Test Corp");
    }

    #[test]
    fn reject_bad_servers() {
        assert!(ScepClient::new("not a url").is_err());
        assert!(ScepClient::new("ftp://ca.testcorp.com/").is_err());
        assert!(ScepClient::new("mailto:ca@testcorp.com").is_err());
    }
}
