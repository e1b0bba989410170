//! The command line client against a SCEP CA stub.
mod common;

use clap::Parser;
use scepc::cli::{Options, Outcome, ScepcClient};
use scepc::scep::types::FailInfo;
use scepc::scep::PemDestination;
use scepc::test::{CaBehaviour, CaStub};

use common::{CaCertMode, TestCa};

fn options(server: &str, extra: &[&str]) -> Options {
    let mut args = vec!["scepc", "--server", server];
    args.extend_from_slice(extra);
    Options::try_parse_from(args).unwrap()
}

#[tokio::test]
async fn writes_certificate_and_key() {
    let test_ca = TestCa::start(CaStub::new(), CaCertMode::Chain).await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("device.pem");
    let key_out = dir.path().join("device.key");

    let client = ScepcClient::new(options(
        &test_ca.server.uri(),
        &[
            "--cn",
            "device.testcorp.com",
            "--san",
            "device.testcorp.com",
            "--out",
            out.to_str().unwrap(),
            "--key-out",
            key_out.to_str().unwrap(),
        ],
    ))
    .unwrap();

    let outcome = client.enroll().await.unwrap();
    assert_eq!(outcome, Outcome::Issued(PemDestination::File(out.clone())));
    assert_eq!(outcome.exit_code(), 0);

    let cert = openssl::x509::X509::from_pem(&std::fs::read(&out).unwrap()).unwrap();
    let key = openssl::pkey::PKey::private_key_from_pem(&std::fs::read(&key_out).unwrap()).unwrap();
    assert!(cert.public_key().unwrap().public_eq(&key));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&key_out).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[tokio::test]
async fn rejection_exits_with_one() {
    let ca = CaStub::new().with_behaviour(CaBehaviour::Reject {
        fail_info: FailInfo::BadCertId,
        text: None,
    });
    let test_ca = TestCa::start(ca, CaCertMode::Single).await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("device.pem");

    let client = ScepcClient::new(options(&test_ca.server.uri(), &["--out", out.to_str().unwrap()])).unwrap();
    let outcome = client.enroll().await.unwrap();

    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(
        outcome.to_string(),
        "Certificate issue failed: No certificate could be identified matching the provided criteria"
    );
    assert!(!out.exists());
}

#[tokio::test]
async fn pending_exits_with_two() {
    let test_ca = TestCa::start(CaStub::new().with_behaviour(CaBehaviour::Pending), CaCertMode::Single).await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("device.pem");

    let client = ScepcClient::new(options(&test_ca.server.uri(), &["--out", out.to_str().unwrap()])).unwrap();
    let outcome = client.enroll().await.unwrap();

    assert!(matches!(outcome, Outcome::Pending(_)));
    assert_eq!(outcome.exit_code(), 2);
    assert!(!out.exists());
}
