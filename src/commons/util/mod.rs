//! General utility modules for use all over the code base
use std::net::IpAddr;
use std::str::FromStr;

use bytes::Bytes;

pub mod ext_serde;
pub mod file;
pub mod httpclient;

/// Returns the SHA256 hash for the given octets.
pub fn sha256(object: &[u8]) -> Bytes {
    Bytes::copy_from_slice(&openssl::sha::sha256(object))
}

/// Returns whether the authority part of a URI points at this machine.
///
/// Only literal names are recognised, no resolving is done.
fn is_local_authority(auth: &str) -> bool {
    let host = if let Some(stripped) = auth.strip_prefix('[') {
        // [::1]:8443
        stripped.split(']').next().unwrap_or_default()
    } else if auth.matches(':').count() == 1 {
        auth.split(':').next().unwrap_or_default()
    } else {
        auth
    };

    host.eq_ignore_ascii_case("localhost") || IpAddr::from_str(host).map(|ip| ip.is_loopback()).unwrap_or(false)
}

/// Returns whether the given URI is an HTTPS URI for this machine.
pub fn is_local_https_uri(uri: &str) -> bool {
    match uri.strip_prefix("https://") {
        Some(rest) => is_local_authority(rest.split('/').next().unwrap_or_default()),
        None => false,
    }
}

//------------ Tests ---------------------------------------------------------
