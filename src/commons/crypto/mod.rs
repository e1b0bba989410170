mod error;
pub use self::error::*;

pub mod bootstrap;
pub mod cms;
pub mod csr;
pub mod keys;
pub mod oid;

pub use self::bootstrap::BootstrapIdentity;
pub use self::csr::{AltNames, CertificateSigningRequest, DistinguishedName, ExtraExtension};
pub use self::keys::KeyPair;

pub type CryptoResult<T> = std::result::Result<T, self::error::Error>;
