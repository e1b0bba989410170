//! SCEP PKI messages.
//!
//! A PKI message is a CMS signed-data. The SCEP specific information travels
//! in signed attributes, which we call the header here. The signed content,
//! if any, is an enveloped-data holding the actual request or response.
use bcder::encode::Values;
use bcder::Mode;
use bytes::Bytes;
use log::debug;
use openssl::pkey::{PKeyRef, Private};
use openssl::x509::{X509, X509Ref};

use crate::commons::crypto::cms::{CertificateNames, CmsCodec, OpenSslCms, SignedAttribute, SignedContent};
use crate::commons::crypto::oid::{self, ConstOid};
use crate::commons::crypto::{self, BootstrapIdentity, CertificateSigningRequest, CryptoResult};
use crate::commons::error::Error;
use crate::commons::ScepResult;
use crate::scep::correlate::Correlation;
use crate::scep::types::{FailInfo, MessageType, Nonce, PkiStatus, TransactionId};

//------------ PkiHeader -----------------------------------------------------

/// The SCEP attributes of a PKI message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PkiHeader {
    message_type: MessageType,
    transaction_id: Option<TransactionId>,
    sender_nonce: Option<Nonce>,
    recipient_nonce: Option<Nonce>,
    pki_status: Option<PkiStatus>,
    fail_info: Option<FailInfo>,
    fail_info_text: Option<String>,
}

/// # Creating
///
impl PkiHeader {
    pub fn request(message_type: MessageType, correlation: &Correlation) -> Self {
        PkiHeader {
            message_type,
            transaction_id: Some(correlation.transaction_id().clone()),
            sender_nonce: Some(correlation.sender_nonce().clone()),
            recipient_nonce: None,
            pki_status: None,
            fail_info: None,
            fail_info_text: None,
        }
    }

    pub fn response(message_type: MessageType, status: PkiStatus) -> Self {
        PkiHeader {
            message_type,
            transaction_id: None,
            sender_nonce: None,
            recipient_nonce: None,
            pki_status: Some(status),
            fail_info: None,
            fail_info_text: None,
        }
    }

    pub fn with_transaction_id(mut self, transaction_id: Option<TransactionId>) -> Self {
        self.transaction_id = transaction_id;
        self
    }

    pub fn with_sender_nonce(mut self, nonce: Option<Nonce>) -> Self {
        self.sender_nonce = nonce;
        self
    }

    pub fn with_recipient_nonce(mut self, nonce: Option<Nonce>) -> Self {
        self.recipient_nonce = nonce;
        self
    }

    pub fn with_fail_info(mut self, fail_info: Option<FailInfo>) -> Self {
        self.fail_info = fail_info;
        self
    }

    pub fn with_fail_info_text(mut self, text: Option<String>) -> Self {
        self.fail_info_text = text;
        self
    }
}

/// # Accessors
///
impl PkiHeader {
    pub fn message_type(&self) -> MessageType {
        self.message_type.clone()
    }

    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.transaction_id.as_ref()
    }

    pub fn sender_nonce(&self) -> Option<&Nonce> {
        self.sender_nonce.as_ref()
    }

    pub fn recipient_nonce(&self) -> Option<&Nonce> {
        self.recipient_nonce.as_ref()
    }

    pub fn pki_status(&self) -> Option<PkiStatus> {
        self.pki_status
    }

    pub fn fail_info(&self) -> Option<&FailInfo> {
        self.fail_info.as_ref()
    }

    pub fn fail_info_text(&self) -> Option<&str> {
        self.fail_info_text.as_deref()
    }
}

/// # Encoding and decoding
///
impl PkiHeader {
    fn to_attributes(&self) -> Vec<SignedAttribute> {
        let mut attributes = Vec::new();

        if self.message_type != MessageType::missing() {
            attributes.push(SignedAttribute::printable(
                &oid::SCEP_MESSAGE_TYPE,
                &self.message_type.to_attribute_value(),
            ));
        }
        if let Some(transaction_id) = &self.transaction_id {
            attributes.push(SignedAttribute::printable(&oid::SCEP_TRANSACTION_ID, transaction_id.as_str()));
        }
        if let Some(nonce) = &self.sender_nonce {
            attributes.push(SignedAttribute::octets(&oid::SCEP_SENDER_NONCE, nonce.as_bytes()));
        }
        if let Some(nonce) = &self.recipient_nonce {
            attributes.push(SignedAttribute::octets(&oid::SCEP_RECIPIENT_NONCE, nonce.as_bytes()));
        }
        if let Some(status) = self.pki_status {
            attributes.push(SignedAttribute::printable(&oid::SCEP_PKI_STATUS, &status.to_attribute_value()));
        }
        if let Some(fail_info) = &self.fail_info {
            attributes.push(SignedAttribute::printable(&oid::SCEP_FAIL_INFO, &fail_info.to_attribute_value()));
        }
        if let Some(text) = &self.fail_info_text {
            attributes.push(SignedAttribute::utf8(&oid::SCEP_FAIL_INFO_TEXT, text));
        }

        attributes
    }

    fn from_signed(signed: &SignedContent) -> ScepResult<Self> {
        // Whether an odd type is acceptable is up to the caller.
        let message_type = string_attr(signed, &oid::SCEP_MESSAGE_TYPE, "messageType")?
            .map(|value| MessageType::from_attribute_value(&value))
            .unwrap_or_else(MessageType::missing);

        let transaction_id = string_attr(signed, &oid::SCEP_TRANSACTION_ID, "transactionID")?.map(TransactionId::from);
        let sender_nonce = octets_attr(signed, &oid::SCEP_SENDER_NONCE, "senderNonce")?.map(Nonce::from);
        let recipient_nonce = octets_attr(signed, &oid::SCEP_RECIPIENT_NONCE, "recipientNonce")?.map(Nonce::from);

        let pki_status = match string_attr(signed, &oid::SCEP_PKI_STATUS, "pkiStatus")? {
            Some(status) => Some(status.parse::<PkiStatus>().map_err(Error::malformed)?),
            None => None,
        };

        let fail_info =
            string_attr(signed, &oid::SCEP_FAIL_INFO, "failInfo")?.map(|info| FailInfo::from_attribute_value(&info));
        let fail_info_text = string_attr(signed, &oid::SCEP_FAIL_INFO_TEXT, "failInfoText")?;

        Ok(PkiHeader {
            message_type,
            transaction_id,
            sender_nonce,
            recipient_nonce,
            pki_status,
            fail_info,
            fail_info_text,
        })
    }
}

fn string_attr(signed: &SignedContent, oid: &ConstOid, name: &str) -> ScepResult<Option<String>> {
    match signed.attribute(oid) {
        None => Ok(None),
        Some(attr) => attr
            .as_string()
            .map(Some)
            .ok_or_else(|| Error::malformed(format!("{} attribute is not a string", name))),
    }
}

fn octets_attr(signed: &SignedContent, oid: &ConstOid, name: &str) -> ScepResult<Option<Bytes>> {
    match signed.attribute(oid) {
        None => Ok(None),
        Some(attr) => attr
            .as_octets()
            .map(Some)
            .ok_or_else(|| Error::malformed(format!("{} attribute is not an octet string", name))),
    }
}

//------------ PkiMessage ----------------------------------------------------

/// An encoded PKI message together with its decoded parts.
#[derive(Clone, Debug)]
pub struct PkiMessage {
    header: PkiHeader,
    signed: SignedContent,
    raw: Bytes,
}

impl PkiMessage {
    pub fn header(&self) -> &PkiHeader {
        &self.header
    }

    /// The signed content, normally an enveloped-data.
    pub fn content(&self) -> Option<&Bytes> {
        self.signed.content()
    }

    /// The certificates included by the signer.
    pub fn certificates(&self) -> ScepResult<Vec<X509>> {
        self.signed.x509_certificates().map_err(Error::malformed)
    }

    /// The encoded message as sent over the wire.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Checks the message was signed by the key of the given certificate.
    pub fn verify_signature(&self, signer: &X509Ref) -> CryptoResult<()> {
        self.signed.verify_signature(signer)
    }

    /// Returns the first of the candidates that signed this message.
    pub fn find_signer<'a>(&self, candidates: impl IntoIterator<Item = &'a X509>) -> Option<&'a X509> {
        candidates
            .into_iter()
            .find(|cert| self.verify_signature(cert).is_ok())
    }
}

//------------ ScepRequest ---------------------------------------------------

/// The content of an outgoing request.
#[derive(Clone, Copy)]
pub enum ScepRequest<'a> {
    PkcsReq(&'a CertificateSigningRequest),
    RenewalReq(&'a CertificateSigningRequest),

    /// Asks about a pending request, identified by the CA and our subject.
    CertPoll,

    /// Asks for a certificate by its issuer and serial number.
    GetCert(&'a X509Ref),

    /// Asks for the CRL covering the given certificate.
    GetCrl(&'a X509Ref),
}

impl ScepRequest<'_> {
    pub fn message_type(&self) -> MessageType {
        match self {
            ScepRequest::PkcsReq(_) => MessageType::PkcsReq,
            ScepRequest::RenewalReq(_) => MessageType::RenewalReq,
            ScepRequest::CertPoll => MessageType::CertPoll,
            ScepRequest::GetCert(_) => MessageType::GetCert,
            ScepRequest::GetCrl(_) => MessageType::GetCrl,
        }
    }

    /// The DER encoded content that gets enveloped for the CA.
    fn content(&self, requester: &X509Ref, ca: &X509Ref) -> CryptoResult<Bytes> {
        match self {
            ScepRequest::PkcsReq(csr) | ScepRequest::RenewalReq(csr) => Ok(csr.der().clone()),
            ScepRequest::CertPoll => {
                let ca = CertificateNames::from_x509(ca)?;
                let requester = CertificateNames::from_x509(requester)?;
                Ok(ca.issuer_and_subject(&requester).to_captured(Mode::Der).into_bytes())
            }
            ScepRequest::GetCert(cert) | ScepRequest::GetCrl(cert) => {
                let names = CertificateNames::from_x509(cert)?;
                Ok(names.issuer_and_serial().to_captured(Mode::Der).into_bytes())
            }
        }
    }
}

//------------ ScepMessageCodec ----------------------------------------------

/// Builds and parses PKI messages on top of a [`CmsCodec`].
#[derive(Clone, Debug, Default)]
pub struct ScepMessageCodec<C = OpenSslCms> {
    cms: C,
}

impl<C: CmsCodec> ScepMessageCodec<C> {
    pub fn new(cms: C) -> Self {
        ScepMessageCodec { cms }
    }

    pub fn cms(&self) -> &C {
        &self.cms
    }

    /// Builds the signed and enveloped message for a request.
    ///
    /// The request content is encrypted to the CA certificate and the
    /// result is signed with the bootstrap identity.
    pub fn build_request(
        &self,
        request: &ScepRequest,
        identity: &BootstrapIdentity,
        ca: &X509Ref,
        correlation: &Correlation,
    ) -> ScepResult<PkiMessage> {
        let content = request
            .content(identity.certificate(), ca)
            .map_err(Error::envelope)?;
        let header = PkiHeader::request(request.message_type(), correlation);

        debug!(
            "Building {} for transaction {}",
            header.message_type(),
            correlation.transaction_id()
        );

        self.seal(header, Some(&content[..]), identity.certificate(), identity.key().pkey(), Some(ca))
            .map_err(Error::envelope)
    }

    /// Signs a message with the given header, enveloping the content to the
    /// recipient if there is one.
    pub fn seal(
        &self,
        header: PkiHeader,
        content: Option<&[u8]>,
        signer: &X509Ref,
        key: &PKeyRef<Private>,
        recipient: Option<&X509Ref>,
    ) -> CryptoResult<PkiMessage> {
        let raw = self
            .cms
            .encode(content, signer, key, recipient, &header.to_attributes())?;
        let signed = self.cms.decode(&raw)?;
        Ok(PkiMessage { header, signed, raw })
    }

    /// Decodes a PKI message received from the wire.
    ///
    /// Nothing is trusted at this point: the signature is not checked and
    /// the content is not opened.
    pub fn parse_response(&self, raw: Bytes) -> ScepResult<PkiMessage> {
        let signed = self.cms.decode(&raw).map_err(Error::malformed)?;
        let header = PkiHeader::from_signed(&signed)?;
        Ok(PkiMessage { header, signed, raw })
    }

    /// Decrypts the enveloped content of a message, if there is any.
    pub fn open(&self, message: &PkiMessage, recipient: &X509Ref, key: &PKeyRef<Private>) -> ScepResult<Option<Bytes>> {
        let content = match message.content() {
            Some(content) => content,
            None => return Ok(None),
        };

        let content_type = crypto::cms::content_type(content).map_err(Error::malformed)?;
        if content_type != oid::ENVELOPED_DATA {
            return Err(Error::malformed(format!(
                "expected enveloped-data content, found {}",
                content_type
            )));
        }

        self.cms
            .open(content, recipient, key)
            .map(Some)
            .map_err(Error::malformed)
    }
}

//------------ Tests ---------------------------------------------------------
