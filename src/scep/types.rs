//! The values carried in SCEP signed attributes.
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use rand::RngCore;

use crate::constants::NONCE_SIZE;

//------------ MessageType ---------------------------------------------------

/// The SCEP message types. The codes are fixed by the protocol.
///
/// A response may carry a code outside the defined set, or none at all. It
/// is kept as received so the caller decides what to make of it. An empty
/// value means the attribute was missing.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum MessageType {
    CertRep,
    RenewalReq,
    PkcsReq,
    CertPoll,
    GetCert,
    GetCrl,
    Other(String),
}

impl MessageType {
    pub fn code(&self) -> Option<u8> {
        match self {
            MessageType::CertRep => Some(3),
            MessageType::RenewalReq => Some(17),
            MessageType::PkcsReq => Some(19),
            MessageType::CertPoll => Some(20),
            MessageType::GetCert => Some(21),
            MessageType::GetCrl => Some(22),
            MessageType::Other(_) => None,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            3 => Some(MessageType::CertRep),
            17 => Some(MessageType::RenewalReq),
            19 => Some(MessageType::PkcsReq),
            20 => Some(MessageType::CertPoll),
            21 => Some(MessageType::GetCert),
            22 => Some(MessageType::GetCrl),
            _ => None,
        }
    }

    /// Parses the messageType attribute value. This never fails.
    pub fn from_attribute_value(s: &str) -> Self {
        let s = s.trim();
        s.parse::<u8>()
            .ok()
            .and_then(MessageType::from_code)
            .unwrap_or_else(|| MessageType::Other(s.to_string()))
    }

    /// The type used when a message has no messageType attribute.
    pub fn missing() -> Self {
        MessageType::Other(String::new())
    }

    /// Returns the decimal code as sent in the messageType attribute.
    pub fn to_attribute_value(&self) -> String {
        match (self.code(), self) {
            (Some(code), _) => code.to_string(),
            (None, MessageType::Other(value)) => value.clone(),
            (None, _) => String::new(),
        }
    }
}

impl FromStr for MessageType {
    type Err = TypeParseError;

    /// Only accepts the defined codes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(MessageType::from_code)
            .ok_or_else(|| TypeParseError::new("messageType", s))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            MessageType::CertRep => "CertRep",
            MessageType::RenewalReq => "RenewalReq",
            MessageType::PkcsReq => "PKCSReq",
            MessageType::CertPoll => "CertPoll",
            MessageType::GetCert => "GetCert",
            MessageType::GetCrl => "GetCRL",
            MessageType::Other(value) if value.is_empty() => return write!(f, "missing"),
            MessageType::Other(value) => return write!(f, "unknown ({})", value),
        };
        write!(f, "{} ({})", name, self.to_attribute_value())
    }
}

//------------ PkiStatus -----------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PkiStatus {
    Success,
    Failure,
    Pending,
}

impl PkiStatus {
    pub fn code(self) -> u8 {
        match self {
            PkiStatus::Success => 0,
            PkiStatus::Failure => 2,
            PkiStatus::Pending => 3,
        }
    }

    pub fn to_attribute_value(self) -> String {
        self.code().to_string()
    }
}

impl FromStr for PkiStatus {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(PkiStatus::Success),
            "2" => Ok(PkiStatus::Failure),
            "3" => Ok(PkiStatus::Pending),
            _ => Err(TypeParseError::new("pkiStatus", s)),
        }
    }
}

impl fmt::Display for PkiStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PkiStatus::Success => write!(f, "SUCCESS"),
            PkiStatus::Failure => write!(f, "FAILURE"),
            PkiStatus::Pending => write!(f, "PENDING"),
        }
    }
}

//------------ FailInfo ------------------------------------------------------

/// The reason the CA gives for a FAILURE.
///
/// Codes outside the defined set are kept as they were received, they do not
/// make the response unreadable.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FailInfo {
    BadAlg,
    BadMessageCheck,
    BadRequest,
    BadTime,
    BadCertId,
    Other(String),
}

impl FailInfo {
    pub fn code(&self) -> Option<u8> {
        match self {
            FailInfo::BadAlg => Some(0),
            FailInfo::BadMessageCheck => Some(1),
            FailInfo::BadRequest => Some(2),
            FailInfo::BadTime => Some(3),
            FailInfo::BadCertId => Some(4),
            FailInfo::Other(_) => None,
        }
    }

    /// Parses the failInfo attribute value. This never fails.
    pub fn from_attribute_value(s: &str) -> Self {
        match s.trim() {
            "0" => FailInfo::BadAlg,
            "1" => FailInfo::BadMessageCheck,
            "2" => FailInfo::BadRequest,
            "3" => FailInfo::BadTime,
            "4" => FailInfo::BadCertId,
            other => FailInfo::Other(other.to_string()),
        }
    }

    pub fn to_attribute_value(&self) -> String {
        match self.code() {
            Some(code) => code.to_string(),
            None => match self {
                FailInfo::Other(value) => value.clone(),
                _ => String::new(),
            },
        }
    }

    /// A human readable description of the failure.
    pub fn description(&self) -> &'static str {
        match self {
            FailInfo::BadAlg => "Invalid signing algorithm",
            FailInfo::BadMessageCheck => "Signature verification of the request failed",
            FailInfo::BadRequest => "Transaction not permitted or supported",
            FailInfo::BadTime => "signingTime was not close enough to system time, re-issue the request",
            FailInfo::BadCertId => "No certificate could be identified matching the provided criteria",
            FailInfo::Other(_) => UNSPECIFIED_FAILURE,
        }
    }
}

pub const UNSPECIFIED_FAILURE: &str = "Unspecified failure";

impl fmt::Display for FailInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FailInfo::BadAlg => write!(f, "badAlg"),
            FailInfo::BadMessageCheck => write!(f, "badMessageCheck"),
            FailInfo::BadRequest => write!(f, "badRequest"),
            FailInfo::BadTime => write!(f, "badTime"),
            FailInfo::BadCertId => write!(f, "badCertId"),
            FailInfo::Other(value) => write!(f, "unknown ({})", value),
        }
    }
}

//------------ TransactionId -------------------------------------------------

/// Ties all messages of one enrollment attempt together.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct TransactionId(String);

impl TransactionId {
    /// A random (version 4) UUID drawn from the given source.
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 16];
        rng.fill_bytes(&mut bytes);
        TransactionId(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TransactionId {
    fn from(s: String) -> Self {
        TransactionId(s)
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        TransactionId(s.to_string())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//------------ Nonce ---------------------------------------------------------

/// A sender or recipient nonce.
///
/// Ours are always [`NONCE_SIZE`] bytes, but we accept whatever a CA sends.
#[derive(Clone, Eq, PartialEq)]
pub struct Nonce(Bytes);

impl Nonce {
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rng.fill_bytes(&mut bytes);
        Nonce(Bytes::copy_from_slice(&bytes))
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Bytes> for Nonce {
    fn from(bytes: Bytes) -> Self {
        Nonce(bytes)
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Nonce({})", self)
    }
}

//------------ TypeParseError ------------------------------------------------

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TypeParseError {
    attribute: &'static str,
    value: String,
}

impl TypeParseError {
    fn new(attribute: &'static str, value: &str) -> Self {
        TypeParseError {
            attribute,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for TypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid {} value '{}'", self.attribute, self.value)
    }
}

impl std::error::Error for TypeParseError {}

//------------ Tests ---------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn message_type_codes() {
        for (code, message_type) in [
            (3, MessageType::CertRep),
            (17, MessageType::RenewalReq),
            (19, MessageType::PkcsReq),
            (20, MessageType::CertPoll),
            (21, MessageType::GetCert),
            (22, MessageType::GetCrl),
        ] {
            assert_eq!(message_type.code(), Some(code));
            assert_eq!(MessageType::from_str(&code.to_string()).unwrap(), message_type);
            assert_eq!(MessageType::from_attribute_value(&code.to_string()), message_type);
        }

        assert!(MessageType::from_str("18").is_err());
        assert!(MessageType::from_str("CertRep").is_err());
        assert!(MessageType::from_str("").is_err());
    }

    #[test]
    fn unknown_message_type_is_kept() {
        for value in ["99", "18", "CertRep"] {
            let message_type = MessageType::from_attribute_value(value);
            assert_eq!(message_type, MessageType::Other(value.to_string()));
            assert!(message_type.code().is_none());
            assert_eq!(message_type.to_attribute_value(), value);
            assert_eq!(message_type.to_string(), format!("unknown ({})", value));
        }

        assert_eq!(MessageType::from_attribute_value(" 3 "), MessageType::CertRep);
        assert_eq!(MessageType::from_attribute_value(""), MessageType::missing());
        assert_eq!(MessageType::missing().to_string(), "missing");
        assert_eq!(MessageType::CertRep.to_string(), "CertRep (3)");
    }

    #[test]
    fn pki_status_codes() {
        assert_eq!(PkiStatus::from_str("0").unwrap(), PkiStatus::Success);
        assert_eq!(PkiStatus::from_str("2").unwrap(), PkiStatus::Failure);
        assert_eq!(PkiStatus::from_str("3").unwrap(), PkiStatus::Pending);
        assert!(PkiStatus::from_str("1").is_err());
        assert_eq!(PkiStatus::Pending.to_attribute_value(), "3");
    }

    #[test]
    fn fail_info_descriptions_are_distinct() {
        let known = ["0", "1", "2", "3", "4"].map(FailInfo::from_attribute_value);

        let descriptions: HashSet<&str> = known.iter().map(|info| info.description()).collect();
        assert_eq!(descriptions.len(), 5);
        assert!(descriptions.iter().all(|d| !d.is_empty()));
        assert!(!descriptions.contains(UNSPECIFIED_FAILURE));

        assert_eq!(
            FailInfo::from_attribute_value("3").description(),
            "signingTime was not close enough to system time, re-issue the request"
        );
    }

    #[test]
    fn unknown_fail_info_falls_back() {
        for value in ["5", "99", "garbage", ""] {
            let info = FailInfo::from_attribute_value(value);
            assert_eq!(info, FailInfo::Other(value.to_string()));
            assert_eq!(info.description(), UNSPECIFIED_FAILURE);
            assert!(info.code().is_none());
        }
    }

    #[test]
    fn transaction_ids_are_unique() {
        let mut rng = StdRng::from_os_rng();
        let ids: HashSet<TransactionId> = (0..10_000).map(|_| TransactionId::random(&mut rng)).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn transaction_id_is_a_uuid() {
        let mut rng = StdRng::seed_from_u64(1);
        let id = TransactionId::random(&mut rng);
        let uuid = uuid::Uuid::parse_str(id.as_str()).unwrap();
        assert_eq!(uuid.get_version_num(), 4);
    }

    #[test]
    fn nonces_are_random() {
        let mut rng = StdRng::from_os_rng();
        let first = Nonce::random(&mut rng);
        let second = Nonce::random(&mut rng);

        assert_eq!(first.len(), NONCE_SIZE);
        assert_ne!(first, second);

        let bytes = first.as_bytes();
        assert!(bytes.iter().any(|b| *b != bytes[0]));
    }

    #[test]
    fn seeded_sources_repeat() {
        let mut one = StdRng::seed_from_u64(42);
        let mut two = StdRng::seed_from_u64(42);
        assert_eq!(TransactionId::random(&mut one), TransactionId::random(&mut two));
        assert_eq!(Nonce::random(&mut one), Nonce::random(&mut two));
    }
}
