//! The SCEP protocol: message types, the message codec, transport and the
//! enrollment flow tying them together.
pub mod client;
pub mod correlate;
pub mod enroll;
pub mod interpret;
pub mod msg;
pub mod types;

pub use self::client::{CaIdentity, ScepClient};
pub use self::enroll::{Enrollment, EnrollmentReport, EnrollmentRequest, EnrollmentSettings, EnrollmentWarning};
pub use self::interpret::{EnrollmentResult, IssuedCertificate, PemDestination, Rejection};
