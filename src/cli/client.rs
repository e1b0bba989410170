//! Runs a single enrollment for the command line.
use std::fmt;

use log::{info, warn};

use crate::cli::options::Options;
use crate::commons::error::Error as ScepError;
use crate::commons::util::file;
use crate::config::{Config, ConfigError};
use crate::scep::types::TransactionId;
use crate::scep::{Enrollment, EnrollmentResult, PemDestination, Rejection};

//------------ ScepcClient ---------------------------------------------------

/// Command line client: the options together with the effective config.
pub struct ScepcClient {
    options: Options,
    config: Config,
}

impl ScepcClient {
    /// Reads the config file, if any, and applies the command line
    /// overrides on top of it.
    pub fn new(options: Options) -> Result<Self, Error> {
        let mut config = Config::create(options.config.as_deref())?;

        if let Some(server) = &options.server {
            config.server = server.clone();
        }
        if options.strict {
            config.strict_message_type = true;
        }
        config.verify()?;

        Ok(ScepcClient { options, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Enrolls once and writes the results.
    pub async fn enroll(&self) -> Result<Outcome, Error> {
        self.config.log_summary();

        let mut enrollment = Enrollment::from_config(&self.config)?;
        let report = enrollment.enroll(&self.options.enrollment_request()).await?;

        match report.result() {
            EnrollmentResult::Issued(issued) => {
                let destination = issued.write_pem(&self.options.out)?;
                if let Some(key_out) = &self.options.key_out {
                    let pem = report.key().private_key_pem()?;
                    file::save_private(&pem, key_out).map_err(ScepError::from)?;
                    info!("Wrote private key to {}", key_out.display());
                }
                Ok(Outcome::Issued(destination))
            }
            EnrollmentResult::Rejected(rejection) => Ok(Outcome::Rejected(rejection.clone())),
            EnrollmentResult::Pending => {
                warn!(
                    "Request is pending approval at the CA, transaction {}",
                    report.transaction_id()
                );
                Ok(Outcome::Pending(report.transaction_id().clone()))
            }
        }
    }
}

//------------ Outcome -------------------------------------------------------

/// How an enrollment run ended, if it got as far as an answer from the CA.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    Issued(PemDestination),
    Rejected(Rejection),
    Pending(TransactionId),
}

impl Outcome {
    /// The process exit code: 0 issued, 1 rejected, 2 pending.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Issued(_) => 0,
            Outcome::Rejected(_) => 1,
            Outcome::Pending(_) => 2,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Outcome::Issued(PemDestination::File(path)) => {
                write!(f, "Certificate written to {}", path.display())
            }
            Outcome::Issued(PemDestination::Stdout) => write!(f, "Certificate written to stdout"),
            Outcome::Rejected(rejection) => write!(f, "Certificate issue failed: {}", rejection),
            Outcome::Pending(transaction_id) => {
                write!(f, "Request pending approval, transaction id {}", transaction_id)
            }
        }
    }
}

//------------ Error ---------------------------------------------------------

#[derive(Debug)]
pub enum Error {
    Config(ConfigError),
    Scep(ScepError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Scep(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<ScepError> for Error {
    fn from(e: ScepError) -> Self {
        Error::Scep(e)
    }
}

//------------ Tests ---------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scep::types::FailInfo;

    #[test]
    fn exit_codes() {
        assert_eq!(Outcome::Issued(PemDestination::Stdout).exit_code(), 0);
        assert_eq!(
            Outcome::Rejected(Rejection::new(Some(FailInfo::BadTime), None)).exit_code(),
            1
        );
        assert_eq!(Outcome::Pending(TransactionId::from("1234")).exit_code(), 2);
    }

    #[test]
    fn command_line_overrides_config() {
        use clap::Parser;

        let options = Options::try_parse_from(["scepc", "--server", "http://ca.testcorp.com:8080", "--strict"]).unwrap();
        let client = ScepcClient::new(options).unwrap();
        assert_eq!(client.config().server, "http://ca.testcorp.com:8080");
        assert!(client.config().strict_message_type);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        use clap::Parser;

        let options = Options::try_parse_from(["scepc", "--config", "/nonexistent/scepc.conf"]).unwrap();
        assert!(matches!(ScepcClient::new(options), Err(Error::Config(_))));
    }
}
