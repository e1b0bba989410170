//! CMS signed-data and enveloped-data as used by SCEP.
//!
//! Signed-data is encoded and decoded with bcder, enveloping and opening is
//! left to openssl's PKCS#7 support. The [`CmsCodec`] trait is the seam the
//! SCEP message codec works against.
use std::{fmt, io};

use bcder::decode::{self, DecodeError};
use bcder::encode::{self, Constructed, PrimitiveContent, Values};
use bcder::{Captured, Mode, OctetString, Oid, Tag};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use openssl::hash::MessageDigest;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::{PKeyRef, Private};
use openssl::sign::{Signer, Verifier};
use openssl::stack::Stack;
use openssl::symm::Cipher;
use openssl::x509::{X509, X509Ref};
use serde::de;
use serde::{Deserialize, Deserializer};

use crate::commons::crypto::oid::{self, ConstOid};
use crate::commons::crypto::{CryptoResult, Error};
use crate::commons::util::sha256;

//------------ CmsCodec ------------------------------------------------------

/// The CMS operations needed to speak SCEP.
pub trait CmsCodec {
    /// Creates a signed-data, optionally enveloping the content first.
    ///
    /// If a recipient is given, the content is encrypted to the recipient's
    /// key and the resulting enveloped-data becomes the signed content.
    /// The signer's certificate is included in the signed-data. The
    /// content type, message digest and signing time attributes are always
    /// added to the given attributes.
    fn encode(
        &self,
        content: Option<&[u8]>,
        signer: &X509Ref,
        key: &PKeyRef<Private>,
        recipient: Option<&X509Ref>,
        attributes: &[SignedAttribute],
    ) -> CryptoResult<Bytes>;

    /// Decodes a signed-data content info.
    fn decode(&self, der: &[u8]) -> CryptoResult<SignedContent> {
        SignedContent::decode(der)
    }

    /// Decrypts an enveloped-data content info.
    fn open(&self, enveloped: &[u8], recipient: &X509Ref, key: &PKeyRef<Private>) -> CryptoResult<Bytes>;

    /// Creates a degenerate, certificates only, signed-data.
    fn certs_only(&self, certificates: &[X509]) -> CryptoResult<Bytes>;
}

//------------ EnvelopeCipher ------------------------------------------------

/// The content encryption algorithm used for enveloped-data.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EnvelopeCipher {
    #[default]
    Aes128,
    Aes256,
    Des3,
}

impl EnvelopeCipher {
    fn cipher(self) -> Cipher {
        match self {
            EnvelopeCipher::Aes128 => Cipher::aes_128_cbc(),
            EnvelopeCipher::Aes256 => Cipher::aes_256_cbc(),
            EnvelopeCipher::Des3 => Cipher::des_ede3_cbc(),
        }
    }
}

impl fmt::Display for EnvelopeCipher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EnvelopeCipher::Aes128 => write!(f, "aes128"),
            EnvelopeCipher::Aes256 => write!(f, "aes256"),
            EnvelopeCipher::Des3 => write!(f, "des3"),
        }
    }
}

impl<'de> Deserialize<'de> for EnvelopeCipher {
    fn deserialize<D>(d: D) -> Result<EnvelopeCipher, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string = String::deserialize(d)?;
        match string.as_str() {
            "aes128" => Ok(EnvelopeCipher::Aes128),
            "aes256" => Ok(EnvelopeCipher::Aes256),
            "des3" => Ok(EnvelopeCipher::Des3),
            _ => Err(de::Error::custom(format!(
                "expected \"aes128\", \"aes256\" or \"des3\", found: \"{}\"",
                string
            ))),
        }
    }
}

//------------ OpenSslCms ----------------------------------------------------

/// The default [`CmsCodec`].
#[derive(Clone, Debug, Default)]
pub struct OpenSslCms {
    cipher: EnvelopeCipher,
}

impl OpenSslCms {
    pub fn new(cipher: EnvelopeCipher) -> Self {
        OpenSslCms { cipher }
    }

    pub fn cipher(&self) -> EnvelopeCipher {
        self.cipher
    }

    fn envelope(&self, content: &[u8], recipient: &X509Ref) -> CryptoResult<Bytes> {
        let mut certs = Stack::new().map_err(Error::encryption)?;
        certs.push(recipient.to_owned()).map_err(Error::encryption)?;
        let enveloped =
            Pkcs7::encrypt(&certs, content, self.cipher.cipher(), Pkcs7Flags::BINARY).map_err(Error::encryption)?;
        enveloped.to_der().map(Bytes::from).map_err(Error::encryption)
    }
}

impl CmsCodec for OpenSslCms {
    fn encode(
        &self,
        content: Option<&[u8]>,
        signer: &X509Ref,
        key: &PKeyRef<Private>,
        recipient: Option<&X509Ref>,
        attributes: &[SignedAttribute],
    ) -> CryptoResult<Bytes> {
        let content = match (content, recipient) {
            (Some(content), Some(recipient)) => Some(self.envelope(content, recipient)?),
            (Some(content), None) => Some(Bytes::copy_from_slice(content)),
            (None, _) => None,
        };

        let signer_der = signer.to_der().map_err(Error::encode)?;
        let names = CertificateNames::from_der(&signer_der)?;

        let signed_attributes = SignedAttributes::new(content.as_deref(), attributes);
        let signature = signed_attributes.sign(key)?;

        let signer_info = encode::sequence((
            (
                1u8.encode(), // version, issuerAndSerialNumber
                names.issuer_and_serial(),
                sha256_algorithm(),
                Constructed::new(Tag::CTX_0, &signed_attributes.sorted),
            ),
            (
                encode::sequence((oid::RSA_ENCRYPTION.encode(), ().encode())),
                OctetString::new(signature).encode(),
            ),
        ))
        .to_captured(Mode::Der);

        let certificates = PreEncoded(Bytes::from(signer_der)).into_captured();

        Ok(encode_signed_data(content, &certificates, Some(&signer_info)))
    }

    fn open(&self, enveloped: &[u8], recipient: &X509Ref, key: &PKeyRef<Private>) -> CryptoResult<Bytes> {
        let pkcs7 = Pkcs7::from_der(enveloped).map_err(Error::decryption)?;
        pkcs7
            .decrypt(key, recipient, Pkcs7Flags::empty())
            .map(Bytes::from)
            .map_err(Error::decryption)
    }

    fn certs_only(&self, certificates: &[X509]) -> CryptoResult<Bytes> {
        let mut der = Vec::new();
        for cert in certificates {
            der.extend_from_slice(&cert.to_der().map_err(Error::encode)?);
        }
        let certificates = PreEncoded(Bytes::from(der)).into_captured();
        Ok(encode_signed_data(None, &certificates, None))
    }
}

/// Encodes a signed-data content info.
///
/// ```text
/// SignedData ::= SEQUENCE {
///      version CMSVersion,
///      digestAlgorithms DigestAlgorithmIdentifiers,
///      encapContentInfo EncapsulatedContentInfo,
///      certificates [0] IMPLICIT CertificateSet OPTIONAL,
///      crls [1] IMPLICIT RevocationInfoChoices OPTIONAL,
///      signerInfos SignerInfos }
/// ```
///
/// Without a signer info this is the degenerate certificates only form,
/// which has no digest algorithms either.
fn encode_signed_data(content: Option<Bytes>, certificates: &Captured, signer_info: Option<&Captured>) -> Bytes {
    let signed_data = encode::sequence((
        (
            1u8.encode(),
            encode::set(signer_info.map(|_| sha256_algorithm())),
            encode::sequence((
                oid::DATA.encode(),
                content.map(|content| Constructed::new(Tag::CTX_0, OctetString::new(content).encode())),
            )),
        ),
        (Constructed::new(Tag::CTX_0, certificates), encode::set(signer_info)),
    ));

    encode::sequence((oid::SIGNED_DATA.encode(), Constructed::new(Tag::CTX_0, signed_data)))
        .to_captured(Mode::Der)
        .into_bytes()
}

fn sha256_algorithm() -> impl Values {
    encode::sequence(oid::SHA256.encode())
}

//------------ PreEncoded ----------------------------------------------------

/// Values that are already DER encoded, written out as they are.
///
/// Certificates from openssl and the sorted signed attributes arrive as
/// finished encodings. They must be embedded without being parsed again.
struct PreEncoded(Bytes);

impl PreEncoded {
    fn into_captured(self) -> Captured {
        Captured::from_values(Mode::Der, self)
    }
}

impl Values for PreEncoded {
    fn encoded_len(&self, _mode: Mode) -> usize {
        self.0.len()
    }

    fn write_encoded<W: io::Write>(&self, _mode: Mode, target: &mut W) -> Result<(), io::Error> {
        target.write_all(self.0.as_ref())
    }
}

//------------ SignedAttribute -----------------------------------------------

/// A signed attribute with a single value.
#[derive(Clone)]
pub struct SignedAttribute {
    oid: Oid<Bytes>,
    value: Captured,
}

/// # Creating
///
impl SignedAttribute {
    fn new<V: Values>(oid: &ConstOid, value: V) -> Self {
        SignedAttribute {
            oid: Oid(Bytes::from_static(oid.0)),
            value: value.to_captured(Mode::Der),
        }
    }

    pub fn printable(oid: &ConstOid, value: &str) -> Self {
        Self::new(
            oid,
            OctetString::new(Bytes::copy_from_slice(value.as_bytes())).encode_as(Tag::PRINTABLE_STRING),
        )
    }

    pub fn utf8(oid: &ConstOid, value: &str) -> Self {
        Self::new(
            oid,
            OctetString::new(Bytes::copy_from_slice(value.as_bytes())).encode_as(Tag::UTF8_STRING),
        )
    }

    pub fn octets(oid: &ConstOid, value: &[u8]) -> Self {
        Self::new(oid, OctetString::new(Bytes::copy_from_slice(value)).encode())
    }

    pub fn object(oid: &ConstOid, value: &ConstOid) -> Self {
        Self::new(oid, Oid(value.0).encode())
    }

    pub fn utc_time(oid: &ConstOid, time: DateTime<Utc>) -> Self {
        let text = time.format("%y%m%d%H%M%SZ").to_string();
        Self::new(oid, OctetString::new(Bytes::from(text)).encode_as(Tag::UTC_TIME))
    }

    fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((self.oid.clone().encode(), encode::set(&self.value)))
    }
}

/// # Accessors
///
impl SignedAttribute {
    pub fn oid(&self) -> &Oid<Bytes> {
        &self.oid
    }

    /// Returns the value if it is a printable, UTF-8 or IA5 string.
    pub fn as_string(&self) -> Option<String> {
        let (tag, bytes) = self.primitive()?;
        if tag == Tag::PRINTABLE_STRING || tag == Tag::UTF8_STRING || tag == Tag::IA5_STRING {
            String::from_utf8(bytes.to_vec()).ok()
        } else {
            None
        }
    }

    /// Returns the value if it is an octet string.
    pub fn as_octets(&self) -> Option<Bytes> {
        Mode::Ber
            .decode(self.value.as_slice(), OctetString::take_from)
            .ok()
            .map(|octets| octets.into_bytes())
    }

    fn primitive(&self) -> Option<(Tag, Bytes)> {
        Mode::Ber
            .decode(self.value.as_slice(), |cons| {
                cons.take_value(|tag, content| Ok((tag, content.as_primitive()?.take_all()?)))
            })
            .ok()
    }
}

impl fmt::Debug for SignedAttribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.oid, hex::encode(self.value.as_slice()))
    }
}

//------------ SignedAttributes ----------------------------------------------

/// The complete, sorted, set of signed attributes of a signer info.
struct SignedAttributes {
    sorted: Captured,
}

impl SignedAttributes {
    /// Adds content type, message digest and signing time to the given
    /// attributes and sorts them.
    ///
    /// A DER SET OF must be sorted by the encodings of its elements. The
    /// signature covers the DER encoding, so this matters.
    fn new(content: Option<&[u8]>, attributes: &[SignedAttribute]) -> Self {
        let digest = sha256(content.unwrap_or_default());

        let mut all = vec![
            SignedAttribute::object(&oid::CONTENT_TYPE, &oid::DATA),
            SignedAttribute::octets(&oid::MESSAGE_DIGEST, &digest),
            SignedAttribute::utc_time(&oid::SIGNING_TIME, Utc::now()),
        ];
        all.extend_from_slice(attributes);

        let mut encoded: Vec<Bytes> = all
            .iter()
            .map(|attr| attr.encode_ref().to_captured(Mode::Der).into_bytes())
            .collect();
        encoded.sort();

        SignedAttributes {
            sorted: PreEncoded(Bytes::from(encoded.concat())).into_captured(),
        }
    }

    fn sign(&self, key: &PKeyRef<Private>) -> CryptoResult<Bytes> {
        // See section 5.4 of RFC 5652: the signature is over the explicit
        // SET OF encoding, not the IMPLICIT [0] of the signer info.
        let encode_in_set = encode::set(&self.sorted).to_captured(Mode::Der);

        let mut signer = Signer::new(MessageDigest::sha256(), key).map_err(Error::signing)?;
        signer.update(encode_in_set.as_slice()).map_err(Error::signing)?;
        signer.sign_to_vec().map(Bytes::from).map_err(Error::signing)
    }
}

//------------ SignedContent -------------------------------------------------

/// A decoded signed-data.
///
/// This keeps what SCEP needs: the content, the embedded certificates and
/// the signed attributes. Signatures are not checked while decoding, see
/// [`SignedContent::verify_signature`].
#[derive(Clone, Debug)]
pub struct SignedContent {
    content_type: Oid<Bytes>,
    content: Option<Bytes>,
    certificates: Vec<Bytes>,
    signer_infos: Vec<SignerInfo>,
}

#[derive(Clone, Debug)]
pub struct SignerInfo {
    digest_algorithm: Oid<Bytes>,
    signature_algorithm: Oid<Bytes>,
    signed_attrs: Option<Bytes>,
    attributes: Vec<SignedAttribute>,
    signature: Bytes,
}

/// # Decoding
///
impl SignedContent {
    pub fn decode(der: &[u8]) -> CryptoResult<Self> {
        let mut signed = Mode::Ber
            .decode(der, Self::take_from)
            .map_err(|e| Error::decode(format!("invalid signed-data: {}", e)))?;

        for info in signed.signer_infos.iter_mut() {
            if let Some(signed_attrs) = info.signed_attrs.clone() {
                info.attributes = Mode::Ber
                    .decode(signed_attrs, |cons| cons.take_set(SignerInfo::take_attributes))
                    .map_err(|e| Error::decode(format!("invalid signed attributes: {}", e)))?;
            }
        }

        Ok(signed)
    }

    fn take_from<S: decode::Source>(cons: &mut decode::Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            oid::SIGNED_DATA.skip_if(cons)?; // contentType
            cons.take_constructed_if(Tag::CTX_0, Self::take_signed_data)
        })
    }

    fn take_signed_data<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            cons.take_u8()?; // version
            cons.take_set(|cons| cons.skip_all())?; // digestAlgorithms

            let (content_type, content) = cons.take_sequence(|cons| {
                // encapContentInfo
                Ok((
                    Oid::take_from(cons)?,
                    cons.take_opt_constructed_if(Tag::CTX_0, OctetString::take_from)?,
                ))
            })?;

            let certificates = cons
                .take_opt_constructed_if(Tag::CTX_0, Self::take_certificates)?
                .unwrap_or_default();

            cons.take_opt_constructed_if(Tag::CTX_1, |cons| cons.skip_all())?; // crls

            let signer_infos = cons.take_set(|cons| {
                let mut infos = Vec::new();
                while let Some(info) = cons.take_opt_sequence(SignerInfo::take_content)? {
                    infos.push(info);
                }
                Ok(infos)
            })?;

            Ok(SignedContent {
                content_type,
                content: content.map(|content| content.into_bytes()),
                certificates,
                signer_infos,
            })
        })
    }

    fn take_certificates<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
    ) -> Result<Vec<Bytes>, DecodeError<S::Error>> {
        let mut certificates = Vec::new();
        while let Some(content) = cons.take_opt_sequence(|cons| cons.capture_all())? {
            certificates.push(encode::sequence(content).to_captured(Mode::Ber).into_bytes());
        }
        Ok(certificates)
    }
}

/// # Accessors
///
impl SignedContent {
    pub fn content_type(&self) -> &Oid<Bytes> {
        &self.content_type
    }

    pub fn content(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }

    /// The DER encoded certificates, in the order they were found.
    pub fn certificates(&self) -> &[Bytes] {
        &self.certificates
    }

    /// The certificates parsed by openssl.
    pub fn x509_certificates(&self) -> CryptoResult<Vec<X509>> {
        self.certificates
            .iter()
            .map(|der| X509::from_der(der).map_err(|e| Error::decode(format!("invalid certificate: {}", e))))
            .collect()
    }

    pub fn signer_info(&self) -> Option<&SignerInfo> {
        self.signer_infos.first()
    }

    /// Returns the signed attributes of the first signer, if any.
    pub fn attributes(&self) -> &[SignedAttribute] {
        self.signer_info().map(|info| info.attributes()).unwrap_or_default()
    }

    pub fn attribute(&self, oid: &ConstOid) -> Option<&SignedAttribute> {
        self.attributes().iter().find(|attr| attr.oid() == oid)
    }
}

/// # Validation
///
impl SignedContent {
    /// Verifies the first signer's signature with the given certificate.
    ///
    /// Checks that the message digest attribute matches the content and
    /// that the signature over the signed attributes is valid. Only SHA-256
    /// with RSA is supported.
    pub fn verify_signature(&self, signer: &X509Ref) -> CryptoResult<()> {
        let info = self.signer_info().ok_or_else(|| Error::signing("no signer info"))?;
        let signed_attrs = info
            .signed_attrs
            .as_ref()
            .ok_or_else(|| Error::signing("no signed attributes"))?;

        if info.digest_algorithm != oid::SHA256 {
            return Err(Error::signing(format!(
                "unsupported digest algorithm {}",
                info.digest_algorithm
            )));
        }
        if info.signature_algorithm != oid::RSA_ENCRYPTION && info.signature_algorithm != oid::SHA256_WITH_RSA_ENCRYPTION
        {
            return Err(Error::signing(format!(
                "unsupported signature algorithm {}",
                info.signature_algorithm
            )));
        }

        let digest = info
            .attribute(&oid::MESSAGE_DIGEST)
            .and_then(|attr| attr.as_octets())
            .ok_or_else(|| Error::signing("no message digest attribute"))?;
        if digest != sha256(self.content.as_deref().unwrap_or_default()) {
            return Err(Error::signing("message digest does not match content"));
        }

        let key = signer.public_key().map_err(Error::key_error)?;
        let mut verifier = Verifier::new(MessageDigest::sha256(), &key).map_err(Error::signing)?;
        verifier.update(signed_attrs).map_err(Error::signing)?;
        if verifier.verify(&info.signature).map_err(Error::signing)? {
            Ok(())
        } else {
            Err(Error::signing("invalid signature"))
        }
    }
}

//------------ SignerInfo ----------------------------------------------------

impl SignerInfo {
    /// ```text
    /// SignerInfo ::= SEQUENCE {
    ///      version CMSVersion,
    ///      sid SignerIdentifier,
    ///      digestAlgorithm DigestAlgorithmIdentifier,
    ///      signedAttrs [0] IMPLICIT SignedAttributes OPTIONAL,
    ///      signatureAlgorithm SignatureAlgorithmIdentifier,
    ///      signature SignatureValue,
    ///      unsignedAttrs [1] IMPLICIT UnsignedAttributes OPTIONAL }
    /// ```
    fn take_content<S: decode::Source>(cons: &mut decode::Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_u8()?; // version
        cons.capture_one()?; // sid
        let digest_algorithm = Self::take_algorithm(cons)?;
        let signed_attrs = cons
            .take_opt_constructed_if(Tag::CTX_0, |cons| cons.capture_all())?
            .map(|attrs| encode::set(attrs).to_captured(Mode::Ber).into_bytes());
        let signature_algorithm = Self::take_algorithm(cons)?;
        let signature = OctetString::take_from(cons)?.into_bytes();
        cons.take_opt_constructed_if(Tag::CTX_1, |cons| cons.skip_all())?; // unsignedAttrs

        Ok(SignerInfo {
            digest_algorithm,
            signature_algorithm,
            signed_attrs,
            attributes: vec![],
            signature,
        })
    }

    fn take_algorithm<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
    ) -> Result<Oid<Bytes>, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let algorithm = Oid::take_from(cons)?;
            cons.skip_all()?; // parameters
            Ok(algorithm)
        })
    }

    fn take_attributes<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
    ) -> Result<Vec<SignedAttribute>, DecodeError<S::Error>> {
        let mut attributes = Vec::new();
        while let Some(attr) = cons.take_opt_sequence(|cons| {
            let oid = Oid::take_from(cons)?;
            let value = cons.take_set(|cons| {
                let value = cons.capture_one()?;
                cons.skip_all()?; // SCEP attributes have one value
                Ok(value)
            })?;
            Ok(SignedAttribute { oid, value })
        })? {
            attributes.push(attr);
        }
        Ok(attributes)
    }

    pub fn attributes(&self) -> &[SignedAttribute] {
        &self.attributes
    }

    pub fn attribute(&self, oid: &ConstOid) -> Option<&SignedAttribute> {
        self.attributes.iter().find(|attr| attr.oid() == oid)
    }
}

//------------ CertificateNames ----------------------------------------------

/// The issuer, serial number and subject of a certificate, as DER.
///
/// These identify certificates in signer infos and in the SCEP CertPoll,
/// GetCert and GetCRL requests.
#[derive(Clone, Debug)]
pub struct CertificateNames {
    issuer: Captured,
    serial: Captured,
    subject: Captured,
}

impl CertificateNames {
    pub fn from_x509(cert: &X509Ref) -> CryptoResult<Self> {
        Self::from_der(&cert.to_der().map_err(Error::encode)?)
    }

    /// ```text
    /// TBSCertificate  ::=  SEQUENCE  {
    ///      version         [0]  EXPLICIT Version DEFAULT v1,
    ///      serialNumber         CertificateSerialNumber,
    ///      signature            AlgorithmIdentifier,
    ///      issuer               Name,
    ///      validity             Validity,
    ///      subject              Name,
    ///      ... }
    /// ```
    pub fn from_der(der: &[u8]) -> CryptoResult<Self> {
        Mode::Der
            .decode(der, Self::take_from)
            .map_err(|e| Error::decode(format!("invalid certificate: {}", e)))
    }

    fn take_from<S: decode::Source>(cons: &mut decode::Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let names = cons.take_sequence(|cons| {
                cons.take_opt_constructed_if(Tag::CTX_0, |cons| cons.skip_all())?; // version
                let serial = cons.capture_one()?;
                cons.capture_one()?; // signature
                let issuer = cons.capture_one()?;
                cons.capture_one()?; // validity
                let subject = cons.capture_one()?;
                cons.skip_all()?;
                Ok(CertificateNames { issuer, serial, subject })
            })?;
            cons.skip_all()?; // signatureAlgorithm, signatureValue
            Ok(names)
        })
    }

    /// IssuerAndSerialNumber ::= SEQUENCE { issuer Name, serialNumber INTEGER }
    pub fn issuer_and_serial(&self) -> impl Values + '_ {
        encode::sequence((&self.issuer, &self.serial))
    }

    /// IssuerAndSubject ::= SEQUENCE { issuer Name, subject Name }
    ///
    /// Uses our subject as the issuer, and the subject of `requester`.
    pub fn issuer_and_subject<'a>(&'a self, requester: &'a CertificateNames) -> impl Values + 'a {
        encode::sequence((&self.subject, &requester.subject))
    }

    pub fn subject_der(&self) -> &[u8] {
        self.subject.as_slice()
    }
}

//------------ Helpers -------------------------------------------------------

/// Returns the content type of a DER content info without decoding it.
pub fn content_type(der: &[u8]) -> CryptoResult<Oid<Bytes>> {
    Mode::Ber
        .decode(der, |cons| {
            cons.take_sequence(|cons| {
                let content_type = Oid::take_from(cons)?;
                cons.skip_all()?;
                Ok(content_type)
            })
        })
        .map_err(|e| Error::decode(format!("invalid content info: {}", e)))
}

//------------ Tests ---------------------------------------------------------
