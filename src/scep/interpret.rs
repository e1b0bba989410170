//! Turning a CertRep into an enrollment result.
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use openssl::x509::X509;

use crate::commons::crypto::cms::{self, CmsCodec};
use crate::commons::crypto::{oid, BootstrapIdentity};
use crate::commons::error::{Error, IoError};
use crate::commons::util::file;
use crate::commons::ScepResult;
use crate::scep::msg::{PkiMessage, ScepMessageCodec};
use crate::scep::types::{FailInfo, PkiStatus, UNSPECIFIED_FAILURE};

//------------ EnrollmentResult ----------------------------------------------

/// How an enrollment attempt ended.
#[derive(Clone, Debug)]
pub enum EnrollmentResult {
    Issued(IssuedCertificate),
    Rejected(Rejection),

    /// The CA has to approve the request first. Use a CertPoll to ask again
    /// later.
    Pending,
}

impl EnrollmentResult {
    pub fn is_issued(&self) -> bool {
        matches!(self, EnrollmentResult::Issued(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, EnrollmentResult::Pending)
    }

    /// Returns the certificate, or an error for any other outcome.
    pub fn into_issued(self) -> ScepResult<IssuedCertificate> {
        match self {
            EnrollmentResult::Issued(issued) => Ok(issued),
            EnrollmentResult::Rejected(rejection) => Err(Error::Rejected(rejection)),
            EnrollmentResult::Pending => Err(Error::enrollment("the request is pending approval by the CA")),
        }
    }
}

impl fmt::Display for EnrollmentResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EnrollmentResult::Issued(issued) => write!(f, "issued: {}", issued),
            EnrollmentResult::Rejected(rejection) => write!(f, "rejected: {}", rejection),
            EnrollmentResult::Pending => write!(f, "pending: awaiting manual or external approval"),
        }
    }
}

//------------ Rejection -----------------------------------------------------

/// Why the CA said FAILURE.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rejection {
    fail_info: Option<FailInfo>,
    text: Option<String>,
}

impl Rejection {
    pub fn new(fail_info: Option<FailInfo>, text: Option<String>) -> Self {
        Rejection { fail_info, text }
    }

    pub fn fail_info(&self) -> Option<&FailInfo> {
        self.fail_info.as_ref()
    }

    /// The failInfoText the CA sent along, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn description(&self) -> &'static str {
        self.fail_info
            .as_ref()
            .map(FailInfo::description)
            .unwrap_or(UNSPECIFIED_FAILURE)
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.text {
            Some(text) => write!(f, "{} ({})", self.description(), text),
            None => write!(f, "{}", self.description()),
        }
    }
}

//------------ IssuedCertificate ---------------------------------------------

#[derive(Clone, Debug)]
pub struct IssuedCertificate {
    certificate: X509,
    matches_key: bool,
}

impl IssuedCertificate {
    pub fn certificate(&self) -> &X509 {
        &self.certificate
    }

    /// Whether the certificate is for the key of the attempt.
    pub fn matches_key(&self) -> bool {
        self.matches_key
    }

    pub fn to_der(&self) -> ScepResult<Vec<u8>> {
        self.certificate.to_der().map_err(Error::malformed)
    }

    /// The certificate as a PEM `CERTIFICATE` block.
    pub fn to_pem(&self) -> ScepResult<Vec<u8>> {
        self.certificate.to_pem().map_err(Error::malformed)
    }

    /// Writes the PEM to the given path, or to stdout if the file cannot be
    /// written.
    pub fn write_pem(&self, path: &Path) -> ScepResult<PemDestination> {
        let pem = self.to_pem()?;

        match file::save_private(&pem, path) {
            Ok(()) => {
                info!("Wrote certificate to {}", path.display());
                Ok(PemDestination::File(path.to_path_buf()))
            }
            Err(e) => {
                warn!("{}, writing certificate to stdout instead", e);
                let mut stdout = io::stdout().lock();
                stdout
                    .write_all(&pem)
                    .and_then(|_| stdout.flush())
                    .map_err(|e| IoError::new("Could not write certificate to stdout", e))?;
                Ok(PemDestination::Stdout)
            }
        }
    }
}

impl fmt::Display for IssuedCertificate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let serial = self
            .certificate
            .serial_number()
            .to_bn()
            .and_then(|bn| bn.to_hex_str().map(|hex| hex.to_string()))
            .unwrap_or_else(|_| "?".to_string());
        write!(f, "certificate with serial {}", serial)
    }
}

/// Where [`IssuedCertificate::write_pem`] put the certificate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PemDestination {
    File(PathBuf),
    Stdout,
}

//------------ ResponseInterpreter -------------------------------------------

/// Classifies a parsed CertRep by its status.
pub struct ResponseInterpreter<'a, C> {
    codec: &'a ScepMessageCodec<C>,
    identity: &'a BootstrapIdentity,
}

impl<'a, C: CmsCodec> ResponseInterpreter<'a, C> {
    /// Creates an interpreter for responses to requests made with the given
    /// identity. The CA encrypts the certificate to that identity.
    pub fn new(codec: &'a ScepMessageCodec<C>, identity: &'a BootstrapIdentity) -> Self {
        ResponseInterpreter { codec, identity }
    }

    pub fn interpret(&self, response: &PkiMessage) -> ScepResult<EnrollmentResult> {
        let header = response.header();
        let status = header
            .pki_status()
            .ok_or_else(|| Error::malformed("response has no pkiStatus attribute"))?;

        match status {
            PkiStatus::Success => self.issued(response).map(EnrollmentResult::Issued),
            PkiStatus::Failure => Ok(EnrollmentResult::Rejected(Rejection::new(
                header.fail_info().cloned(),
                header.fail_info_text().map(|text| text.to_string()),
            ))),
            PkiStatus::Pending => Ok(EnrollmentResult::Pending),
        }
    }

    /// Digs the certificate out of a SUCCESS response.
    ///
    /// The payload is normally enveloped to us and holds a certificates only
    /// signed-data. Some CAs skip the envelope.
    fn issued(&self, response: &PkiMessage) -> ScepResult<IssuedCertificate> {
        let content = response
            .content()
            .ok_or_else(|| Error::enrollment("SUCCESS response without content"))?;

        let content_type = cms::content_type(content).map_err(Error::malformed)?;
        let certs_only = if content_type == oid::ENVELOPED_DATA {
            self.codec
                .cms()
                .open(content, self.identity.certificate(), self.identity.key().pkey())
                .map_err(Error::malformed)?
        } else if content_type == oid::SIGNED_DATA {
            content.clone()
        } else {
            return Err(Error::malformed(format!(
                "unexpected content type {} in SUCCESS response",
                content_type
            )));
        };

        let certificates = self
            .codec
            .cms()
            .decode(&certs_only)
            .and_then(|signed| signed.x509_certificates())
            .map_err(Error::malformed)?;

        let key = self.identity.key();
        match certificates.iter().position(|cert| key.matches(cert)) {
            Some(idx) => Ok(IssuedCertificate {
                certificate: certificates[idx].clone(),
                matches_key: true,
            }),
            None => match certificates.into_iter().next() {
                Some(certificate) => Ok(IssuedCertificate {
                    certificate,
                    matches_key: false,
                }),
                None => Err(Error::enrollment("SUCCESS response holds no certificate")),
            },
        }
    }
}

//------------ Tests ---------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commons::crypto::cms::{OpenSslCms, SignedAttribute};
    use crate::commons::crypto::{AltNames, CertificateSigningRequest, DistinguishedName, KeyPair};
    use crate::scep::msg::PkiHeader;
    use crate::scep::types::MessageType;
    use crate::test::CaStub;

    fn client() -> BootstrapIdentity {
        let key = KeyPair::generate().unwrap();
        let csr = CertificateSigningRequest::build(
            &DistinguishedName::new("test.testcorp.com"),
            &AltNames::default(),
            &[],
            &key,
        )
        .unwrap();
        BootstrapIdentity::build(&csr, key, 1).unwrap()
    }

    fn codec() -> ScepMessageCodec {
        ScepMessageCodec::default()
    }

    fn response(ca: &CaStub, header: PkiHeader, content: Option<&[u8]>, to: Option<&BootstrapIdentity>) -> PkiMessage {
        codec()
            .seal(
                header,
                content,
                ca.certificate(),
                ca.key().pkey(),
                to.map(|identity| &**identity.certificate()),
            )
            .unwrap()
    }

    #[test]
    fn failure_maps_fail_info() {
        let ca = CaStub::new();
        let client = client();
        let codec = codec();

        let header =
            PkiHeader::response(MessageType::CertRep, PkiStatus::Failure).with_fail_info(Some(FailInfo::BadTime));
        let result = ResponseInterpreter::new(&codec, &client)
            .interpret(&response(&ca, header, None, None))
            .unwrap();

        match result {
            EnrollmentResult::Rejected(rejection) => {
                assert_eq!(
                    rejection.to_string(),
                    "signingTime was not close enough to system time, re-issue the request"
                );
            }
            other => panic!("expected rejection, got {}", other),
        }
    }

    #[test]
    fn failure_without_fail_info() {
        let ca = CaStub::new();
        let client = client();
        let codec = codec();

        let header = PkiHeader::response(MessageType::CertRep, PkiStatus::Failure)
            .with_fail_info(Some(FailInfo::Other("42".to_string())))
            .with_fail_info_text(Some("policy says no".to_string()));
        let result = ResponseInterpreter::new(&codec, &client)
            .interpret(&response(&ca, header, None, None))
            .unwrap();

        let err = result.into_issued().unwrap_err();
        match err {
            Error::Rejected(rejection) => {
                assert_eq!(rejection.description(), UNSPECIFIED_FAILURE);
                assert_eq!(rejection.text(), Some("policy says no"));
                assert_eq!(rejection.to_string(), "Unspecified failure (policy says no)");
            }
            other => panic!("expected rejection, got {}", other),
        }
    }

    #[test]
    fn pending() {
        let ca = CaStub::new();
        let client = client();
        let codec = codec();

        let header = PkiHeader::response(MessageType::CertRep, PkiStatus::Pending);
        let result = ResponseInterpreter::new(&codec, &client)
            .interpret(&response(&ca, header, None, None))
            .unwrap();
        assert!(result.is_pending());
    }

    #[test]
    fn success_with_enveloped_certificate() {
        let ca = CaStub::new();
        let client = client();
        let codec = codec();

        let issued = ca.issue_for(client.certificate()).unwrap();
        let certs_only = codec.cms().certs_only(&[issued.clone()]).unwrap();

        let header = PkiHeader::response(MessageType::CertRep, PkiStatus::Success);
        let result = ResponseInterpreter::new(&codec, &client)
            .interpret(&response(&ca, header, Some(&certs_only[..]), Some(&client)))
            .unwrap();

        let issued_cert = result.into_issued().unwrap();
        assert!(issued_cert.matches_key());
        assert_eq!(issued_cert.to_der().unwrap(), issued.to_der().unwrap());
        assert!(String::from_utf8(issued_cert.to_pem().unwrap())
            .unwrap()
            .starts_with("-----BEGIN CERTIFICATE-----"));
    }

    #[test]
    fn success_with_bare_certs_only() {
        let ca = CaStub::new();
        let client = client();
        let codec = codec();

        // Some other certificate first, ours second.
        let issued = ca.issue_for(client.certificate()).unwrap();
        let certs_only = codec.cms().certs_only(&[ca.certificate().clone(), issued.clone()]).unwrap();

        let header = PkiHeader::response(MessageType::CertRep, PkiStatus::Success);
        let result = ResponseInterpreter::new(&codec, &client)
            .interpret(&response(&ca, header, Some(&certs_only[..]), None))
            .unwrap();

        let issued_cert = result.into_issued().unwrap();
        assert!(issued_cert.matches_key());
        assert_eq!(issued_cert.to_der().unwrap(), issued.to_der().unwrap());
    }

    #[test]
    fn success_for_another_key() {
        let ca = CaStub::new();
        let client = client();
        let codec = codec();

        let certs_only = codec.cms().certs_only(&[ca.certificate().clone()]).unwrap();
        let header = PkiHeader::response(MessageType::CertRep, PkiStatus::Success);
        let result = ResponseInterpreter::new(&codec, &client)
            .interpret(&response(&ca, header, Some(&certs_only[..]), Some(&client)))
            .unwrap();

        let issued_cert = result.into_issued().unwrap();
        assert!(!issued_cert.matches_key());
    }

    #[test]
    fn success_without_certificates() {
        let ca = CaStub::new();
        let client = client();
        let codec = codec();

        let certs_only = codec.cms().certs_only(&[]).unwrap();
        let header = PkiHeader::response(MessageType::CertRep, PkiStatus::Success);
        let err = ResponseInterpreter::new(&codec, &client)
            .interpret(&response(&ca, header, Some(&certs_only[..]), Some(&client)))
            .unwrap_err();
        assert!(matches!(err, Error::Enrollment(_)));

        let header = PkiHeader::response(MessageType::CertRep, PkiStatus::Success);
        let err = ResponseInterpreter::new(&codec, &client)
            .interpret(&response(&ca, header, None, None))
            .unwrap_err();
        assert!(matches!(err, Error::Enrollment(_)));
    }

    #[test]
    fn success_with_garbage_payload() {
        let ca = CaStub::new();
        let client = client();
        let codec = codec();

        let header = PkiHeader::response(MessageType::CertRep, PkiStatus::Success);
        let err = ResponseInterpreter::new(&codec, &client)
            .interpret(&response(&ca, header, Some(&b"garbage"[..]), Some(&client)))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedMessage(_)));
    }

    #[test]
    fn missing_status() {
        let ca = CaStub::new();
        let client = client();
        let codec = codec();
        let cms = OpenSslCms::default();

        let raw = cms
            .encode(
                None,
                ca.certificate(),
                ca.key().pkey(),
                None,
                &[SignedAttribute::printable(&oid::SCEP_MESSAGE_TYPE, "3")],
            )
            .unwrap();
        let parsed = codec.parse_response(raw).unwrap();
        let err = ResponseInterpreter::new(&codec, &client).interpret(&parsed).unwrap_err();
        assert!(matches!(err, Error::MalformedMessage(_)));
    }

    #[test]
    fn write_pem_to_file_and_fallback() {
        let ca = CaStub::new();
        let client = client();
        let issued = IssuedCertificate {
            certificate: ca.issue_for(client.certificate()).unwrap(),
            matches_key: true,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testcert.pem");
        assert_eq!(issued.write_pem(&path).unwrap(), PemDestination::File(path.clone()));
        let pem = file::read(&path).unwrap();
        assert_eq!(pem.as_ref(), issued.to_pem().unwrap().as_slice());

        // A directory cannot be opened as a file.
        assert_eq!(issued.write_pem(dir.path()).unwrap(), PemDestination::Stdout);
    }
}
