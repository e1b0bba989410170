//! Various scepc-wide constants.

//------------ Binary Names -------------------------------------------------

/// The friendly name of the `scepc` binary.
pub const SCEPC_CLIENT_APP: &str = "SCEP Enrollment Client";

/// The version of this crate, as set in Cargo.toml.
pub const SCEPC_VERSION: &str = env!("CARGO_PKG_VERSION");


//------------ Environment Variables ----------------------------------------

/// The environment variable with the log level.
///
/// The variable should contain the name of a [`log::LevelFilter`]. It will
/// be overwritten by the config file. The default is “info.”
pub const SCEPC_ENV_LOG_LEVEL: &str = "SCEPC_LOG_LEVEL";

/// The environment variable with the path to HTTPS root certificates.
///
/// Multiple paths are separated by colons. The certificates are added as
/// trust anchors for the HTTP client talking to the CA.
pub const SCEPC_HTTPS_ROOT_CERTS_ENV: &str = "SCEPC_HTTPS_ROOT_CERTS";


//------------ HTTP ---------------------------------------------------------

/// The default timeout for HTTP requests to the CA.
pub const HTTP_CLIENT_TIMEOUT_SECS: u64 = 30;

/// The default path below the CA base URL where the SCEP service lives.
///
/// This is where Microsoft NDES listens. Other CAs use e.g.
/// `cgi-bin/pkiclient.exe`.
pub const SCEP_DEFAULT_ENROLLMENT_PATH: &str = "certsrv/mscep/";

/// The SCEP operation to fetch the CA certificate(s).
pub const SCEP_OP_GET_CA_CERT: &str = "GetCACert";

/// The SCEP operation to submit a PKI message.
pub const SCEP_OP_PKI_OPERATION: &str = "PKIOperation";

/// Media type of a GetCACert response carrying a single DER certificate.
pub const CONTENT_TYPE_CA_CERT: &str = "application/x-x509-ca-cert";

/// Media type of a GetCACert response carrying a certs-only signed-data.
pub const CONTENT_TYPE_CA_RA_CERT: &str = "application/x-x509-ca-ra-cert";

/// Media type of PKI messages in both directions.
pub const CONTENT_TYPE_PKI_MESSAGE: &str = "application/x-pki-message";


//------------ Enrollment ---------------------------------------------------

/// The smallest RSA modulus we are willing to generate.
pub const MIN_RSA_KEY_BITS: u32 = 2048;

/// The default bootstrap certificate validity.
pub const BOOTSTRAP_VALIDITY_DAYS: u32 = 1;

/// The longest bootstrap certificate validity we accept (ten years).
pub const BOOTSTRAP_MAX_VALIDITY_DAYS: u32 = 3650;

/// The size of a freshly generated sender nonce in bytes.
pub const NONCE_SIZE: usize = 16;

/// Index of the encryption certificate in a CA/RA certificate chain.
///
/// Using the second certificate follows what NDES and similar CAs do: the
/// first one is the RA signing certificate. This is vendor convention, not
/// something SCEP mandates, so it is configurable.
pub const CA_RA_CERT_DEFAULT_INDEX: usize = 1;

/// The default output file for the issued certificate.
pub const DEFAULT_CERT_OUTPUT: &str = "testcert.pem";
