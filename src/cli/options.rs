//! The command line options for scepc.
use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::commons::crypto::{AltNames, DistinguishedName};
use crate::constants::DEFAULT_CERT_OUTPUT;
use crate::scep::EnrollmentRequest;

//------------ Options -------------------------------------------------------

/// The command line options for the SCEP enrollment client.
#[derive(Clone, Debug, clap::Parser)]
#[command(
    version,
    about = "Requests a certificate from a SCEP CA and writes it as PEM.",
)]
pub struct Options {
    /// Path to a config file. Without one the built-in defaults are used.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// The base URL of the CA, overrides the config file.
    #[arg(short, long, env = "SCEPC_SERVER")]
    pub server: Option<String>,

    /// Where to write the issued certificate.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CERT_OUTPUT)]
    pub out: PathBuf,

    /// Also write the private key, as PKCS#8 PEM, to this file.
    #[arg(long, value_name = "FILE")]
    pub key_out: Option<PathBuf>,

    #[command(flatten)]
    pub subject: SubjectOptions,

    /// A DNS name to request as subject alternative name.
    #[arg(long = "san", value_name = "DNS")]
    pub dns_names: Vec<String>,

    /// An IP address to request as subject alternative name.
    #[arg(long = "ip", value_name = "ADDR")]
    pub ip_addresses: Vec<IpAddr>,

    /// Send a RenewalReq rather than a PKCSReq.
    #[arg(long)]
    pub renew: bool,

    /// Fail if the CA answers with anything but a CertRep.
    #[arg(long)]
    pub strict: bool,
}

impl Options {
    /// Creates the options from the process arguments.
    ///
    /// If the arguments won't result in usable options, exits the process.
    pub fn from_args() -> Self {
        Self::parse()
    }

    pub fn enrollment_request(&self) -> EnrollmentRequest {
        EnrollmentRequest::new(self.subject.distinguished_name())
            .with_alt_names(AltNames::new(self.dns_names.clone(), self.ip_addresses.clone()))
            .renewal(self.renew)
    }
}

//------------ SubjectOptions ------------------------------------------------

/// The subject to request.
#[derive(Clone, Debug, clap::Args)]
pub struct SubjectOptions {
    /// Common name.
    #[arg(long, default_value = "test.testcorp.com")]
    pub cn: String,

    /// Country (C).
    #[arg(long)]
    pub country: Option<String>,

    /// Organization (O).
    #[arg(long)]
    pub org: Option<String>,

    /// Organizational unit (OU).
    #[arg(long)]
    pub org_unit: Option<String>,

    /// Locality (L).
    #[arg(long)]
    pub locality: Option<String>,

    /// State or province (ST).
    #[arg(long)]
    pub province: Option<String>,
}

impl SubjectOptions {
    pub fn distinguished_name(&self) -> DistinguishedName {
        DistinguishedName {
            country: self.country.clone(),
            province: self.province.clone(),
            locality: self.locality.clone(),
            organization: self.org.clone(),
            organizational_unit: self.org_unit.clone(),
            common_name: self.cn.clone(),
        }
    }
}

//------------ Tests ---------------------------------------------------------
