//! PKCS#10 certificate signing requests.
use std::convert::Infallible;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bcder::decode::{self, Content, DecodeError};
use bcder::{Mode, OctetString, Oid, Tag};
use bytes::Bytes;
use openssl::asn1::{Asn1Object, Asn1OctetString};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::stack::Stack;
use openssl::x509::extension::SubjectAlternativeName;
use openssl::x509::{X509Extension, X509Name, X509NameRef, X509Req, X509ReqBuilder};

use crate::commons::crypto::keys::KeyPair;
use crate::commons::crypto::oid;
use crate::commons::error::Error;

//------------ DistinguishedName ---------------------------------------------

/// The subject of a certificate request.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DistinguishedName {
    pub country: Option<String>,
    pub province: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub organizational_unit: Option<String>,
    pub common_name: String,
}

impl DistinguishedName {
    pub fn new(common_name: impl Into<String>) -> Self {
        DistinguishedName {
            common_name: common_name.into(),
            ..Default::default()
        }
    }

    fn entries(&self) -> impl Iterator<Item = (Nid, &str)> {
        [
            (Nid::COUNTRYNAME, self.country.as_deref()),
            (Nid::STATEORPROVINCENAME, self.province.as_deref()),
            (Nid::LOCALITYNAME, self.locality.as_deref()),
            (Nid::ORGANIZATIONNAME, self.organization.as_deref()),
            (Nid::ORGANIZATIONALUNITNAME, self.organizational_unit.as_deref()),
            (Nid::COMMONNAME, Some(self.common_name.as_str())),
        ]
        .into_iter()
        .filter_map(|(nid, value)| value.map(|value| (nid, value)))
    }

    pub fn to_x509_name(&self) -> Result<X509Name, ErrorStack> {
        let mut builder = X509Name::builder()?;
        for (nid, value) in self.entries() {
            builder.append_entry_by_nid(nid, value)?;
        }
        Ok(builder.build())
    }

    /// Reads the attributes we know about from an X.509 name.
    ///
    /// The name must have a common name, other attributes are optional.
    /// Unknown attributes are ignored.
    pub fn from_x509_name(name: &X509NameRef) -> Result<Self, Error> {
        #[allow(deprecated)]
        fn entry(name: &X509NameRef, nid: Nid) -> Option<String> {
            name.entries_by_nid(nid)
                .next()
                .and_then(|entry| entry.data().as_utf8().ok())
                .map(|value| value.to_string())
        }

        let common_name =
            entry(name, Nid::COMMONNAME).ok_or_else(|| Error::malformed("subject has no common name"))?;

        Ok(DistinguishedName {
            country: entry(name, Nid::COUNTRYNAME),
            province: entry(name, Nid::STATEORPROVINCENAME),
            locality: entry(name, Nid::LOCALITYNAME),
            organization: entry(name, Nid::ORGANIZATIONNAME),
            organizational_unit: entry(name, Nid::ORGANIZATIONALUNITNAME),
            common_name,
        })
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<String> = self
            .entries()
            .map(|(nid, value)| {
                let label = match nid {
                    Nid::COUNTRYNAME => "C",
                    Nid::STATEORPROVINCENAME => "ST",
                    Nid::LOCALITYNAME => "L",
                    Nid::ORGANIZATIONNAME => "O",
                    Nid::ORGANIZATIONALUNITNAME => "OU",
                    _ => "CN",
                };
                format!("{}={}", label, value)
            })
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

//------------ AltNames ------------------------------------------------------

/// Subject alternative names: DNS names and IP addresses.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AltNames {
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
}

impl AltNames {
    pub fn new(dns_names: Vec<String>, ip_addresses: Vec<IpAddr>) -> Self {
        AltNames {
            dns_names,
            ip_addresses,
        }
    }

    pub fn dns(names: &[&str]) -> Self {
        AltNames {
            dns_names: names.iter().map(|name| name.to_string()).collect(),
            ip_addresses: vec![],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dns_names.is_empty() && self.ip_addresses.is_empty()
    }

    /// Builds the subjectAltName extension, or `None` if there are no names.
    pub(crate) fn to_extension(
        &self,
        ctx: &openssl::x509::X509v3Context,
    ) -> Result<Option<X509Extension>, ErrorStack> {
        if self.is_empty() {
            return Ok(None);
        }
        let mut san = SubjectAlternativeName::new();
        for name in &self.dns_names {
            san.dns(name);
        }
        for ip in &self.ip_addresses {
            san.ip(&ip.to_string());
        }
        san.build(ctx).map(Some)
    }

    /// Parses the DER encoded value of a subjectAltName extension.
    ///
    /// ```text
    /// GeneralNames ::= SEQUENCE SIZE (1..MAX) OF GeneralName
    ///
    /// GeneralName ::= CHOICE {
    ///      ...
    ///      dNSName                         [2]     IA5String,
    ///      ...
    ///      iPAddress                       [7]     OCTET STRING,
    ///      ... }
    /// ```
    ///
    /// Names of other kinds are skipped.
    pub fn decode_extension_value(value: Bytes) -> Result<Self, Error> {
        let (dns_raw, ip_raw) = Mode::Der
            .decode(value, Self::take_general_names)
            .map_err(|e| Error::malformed(format!("invalid subjectAltName: {}", e)))?;

        let mut names = AltNames::default();
        for raw in dns_raw {
            let name = std::str::from_utf8(&raw).map_err(|_| Error::malformed("invalid DNS name in subjectAltName"))?;
            names.dns_names.push(name.to_string());
        }
        for raw in ip_raw {
            let ip = match raw.len() {
                4 => {
                    let mut octets = [0u8; 4];
                    octets.copy_from_slice(&raw);
                    IpAddr::V4(Ipv4Addr::from(octets))
                }
                16 => {
                    let mut octets = [0u8; 16];
                    octets.copy_from_slice(&raw);
                    IpAddr::V6(Ipv6Addr::from(octets))
                }
                len => {
                    return Err(Error::malformed(format!(
                        "IP address of {} bytes in subjectAltName",
                        len
                    )));
                }
            };
            names.ip_addresses.push(ip);
        }
        Ok(names)
    }

    #[allow(clippy::type_complexity)]
    fn take_general_names<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
    ) -> Result<(Vec<Bytes>, Vec<Bytes>), DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let mut dns = Vec::new();
            let mut ips = Vec::new();
            while let Some(()) = cons.take_opt_value(|tag, content| {
                if tag == Tag::CTX_2 {
                    dns.push(content.as_primitive()?.take_all()?);
                } else if tag == Tag::ctx(7) {
                    ips.push(content.as_primitive()?.take_all()?);
                } else {
                    match content {
                        Content::Primitive(inner) => {
                            inner.take_all()?;
                        }
                        Content::Constructed(inner) => inner.skip_all()?,
                    }
                }
                Ok(())
            })? {}
            Ok((dns, ips))
        })
    }
}

//------------ ExtraExtension ------------------------------------------------

/// An additional extension to request, given as raw DER.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExtraExtension {
    /// Dotted decimal object identifier, e.g. "1.3.6.1.4.1.311.20.2".
    pub oid: String,
    pub critical: bool,
    /// The DER encoded extension value, without the OCTET STRING wrapper.
    pub value: Bytes,
}

impl ExtraExtension {
    fn to_x509_extension(&self) -> Result<X509Extension, ErrorStack> {
        let oid = Asn1Object::from_str(&self.oid)?;
        let value = Asn1OctetString::new_from_bytes(&self.value)?;
        X509Extension::new_from_der(&oid, self.critical, &value)
    }
}

//------------ CertificateSigningRequest -------------------------------------

/// A DER encoded PKCS#10 request, signed with SHA-256/RSA.
pub struct CertificateSigningRequest {
    der: Bytes,
    req: X509Req,
    subject: DistinguishedName,
    alt_names: AltNames,
}

/// # Creating
///
impl CertificateSigningRequest {
    pub fn build(
        subject: &DistinguishedName,
        alt_names: &AltNames,
        extensions: &[ExtraExtension],
        key: &KeyPair,
    ) -> Result<Self, Error> {
        let req = Self::build_req(subject, alt_names, extensions, key).map_err(Error::csr)?;
        let der = req.to_der().map(Bytes::from).map_err(Error::csr)?;

        Ok(CertificateSigningRequest {
            der,
            req,
            subject: subject.clone(),
            alt_names: alt_names.clone(),
        })
    }

    fn build_req(
        subject: &DistinguishedName,
        alt_names: &AltNames,
        extensions: &[ExtraExtension],
        key: &KeyPair,
    ) -> Result<X509Req, ErrorStack> {
        let mut builder = X509ReqBuilder::new()?;
        builder.set_version(0)?;
        let value = subject.to_x509_name()?;
        builder.set_subject_name(&value)?;
        builder.set_pubkey(key.pkey())?;

        let mut stack = Stack::new()?;
        let san = alt_names.to_extension(&builder.x509v3_context(None))?;
        if let Some(san) = san {
            stack.push(san)?;
        }
        for extension in extensions {
            stack.push(extension.to_x509_extension()?)?;
        }
        if !stack.is_empty() {
            builder.add_extensions(&stack)?;
        }

        builder.sign(key.pkey(), MessageDigest::sha256())?;
        Ok(builder.build())
    }
}

/// # Decoding
///
impl CertificateSigningRequest {
    /// Decodes a DER encoded request.
    pub fn decode(der: Bytes) -> Result<Self, Error> {
        let req = X509Req::from_der(&der).map_err(|e| Error::malformed(format!("invalid CSR: {}", e)))?;
        let subject = DistinguishedName::from_x509_name(req.subject_name())?;

        let alt_names = match Self::take_requested_alt_names(der.clone())
            .map_err(|e| Error::malformed(format!("invalid CSR: {}", e)))?
        {
            Some(value) => AltNames::decode_extension_value(value)?,
            None => AltNames::default(),
        };

        Ok(CertificateSigningRequest {
            der,
            req,
            subject,
            alt_names,
        })
    }

    /// Returns the raw subjectAltName value from the extensionRequest.
    ///
    /// ```text
    /// CertificationRequest ::= SEQUENCE {
    ///      certificationRequestInfo CertificationRequestInfo,
    ///      signatureAlgorithm AlgorithmIdentifier,
    ///      signature          BIT STRING }
    ///
    /// CertificationRequestInfo ::= SEQUENCE {
    ///      version       INTEGER { v1(0) },
    ///      subject       Name,
    ///      subjectPKInfo SubjectPublicKeyInfo,
    ///      attributes    [0] Attributes }
    /// ```
    fn take_requested_alt_names(der: Bytes) -> Result<Option<Bytes>, DecodeError<Infallible>> {
        Mode::Der.decode(der, |cons| {
            cons.take_sequence(|cons| {
                let san = cons.take_sequence(|cons| {
                    cons.skip_u8_if(0)?; // version
                    cons.capture_one()?; // subject
                    cons.capture_one()?; // subjectPKInfo
                    let san = cons.take_opt_constructed_if(Tag::CTX_0, |cons| {
                        let mut san = None;
                        while let Some(found) = cons.take_opt_sequence(|cons| {
                            let attr_type = Oid::take_from(cons)?;
                            cons.take_set(|cons| {
                                if attr_type == oid::EXTENSION_REQUEST {
                                    Self::take_san_extension(cons)
                                } else {
                                    cons.skip_all()?;
                                    Ok(None)
                                }
                            })
                        })? {
                            if found.is_some() {
                                san = found;
                            }
                        }
                        Ok(san)
                    })?;
                    Ok(san.flatten())
                })?;
                cons.skip_all()?; // signatureAlgorithm and signature
                Ok(san)
            })
        })
    }

    fn take_san_extension<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
    ) -> Result<Option<Bytes>, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let mut san = None;
            while let Some(()) = cons.take_opt_sequence(|cons| {
                let id = Oid::take_from(cons)?;
                let _critical = cons.take_opt_bool()?;
                let value = OctetString::take_from(cons)?;
                if id == oid::CE_SUBJECT_ALT_NAME {
                    san = Some(value.into_bytes());
                }
                Ok(())
            })? {}
            Ok(san)
        })
    }
}

/// # Accessors
///
impl CertificateSigningRequest {
    pub fn der(&self) -> &Bytes {
        &self.der
    }

    pub fn req(&self) -> &X509Req {
        &self.req
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    pub fn alt_names(&self) -> &AltNames {
        &self.alt_names
    }

    /// Checks the self-signature of the request.
    pub fn verify_signature(&self) -> bool {
        self.req
            .public_key()
            .and_then(|key| self.req.verify(&key))
            .unwrap_or(false)
    }
}

impl fmt::Debug for CertificateSigningRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CertificateSigningRequest")
            .field("subject", &self.subject)
            .field("alt_names", &self.alt_names)
            .field("der", &hex::encode(&self.der))
            .finish()
    }
}

//------------ Tests ---------------------------------------------------------
