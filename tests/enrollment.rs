//! Complete enrollments against a SCEP CA stub.
mod common;

use std::time::Duration;

use openssl::nid::Nid;
use openssl::x509::X509;
use scepc::commons::crypto::{AltNames, DistinguishedName, KeyPair};
use scepc::commons::error::Error;
use scepc::commons::util::httpclient;
use scepc::scep::correlate::CorrelationWarning;
use scepc::scep::types::{FailInfo, MessageType, PkiStatus};
use scepc::scep::{Enrollment, EnrollmentRequest, EnrollmentResult, EnrollmentSettings, EnrollmentWarning};
use scepc::test::{CaBehaviour, CaStub};
use wiremock::ResponseTemplate;

use common::{CaCertMode, TestCa};

fn request() -> EnrollmentRequest {
    EnrollmentRequest::new(DistinguishedName::new("test.testcorp.com"))
        .with_alt_names(AltNames::dns(&["test2.testcorp.com", "test3.testcorp.com"]))
}

#[tokio::test]
async fn enroll_with_single_ca_certificate() {
    let test_ca = TestCa::start(CaStub::new(), CaCertMode::Single).await;
    let mut enrollment = test_ca.enrollment();

    let report = enrollment.enroll(&request()).await.unwrap();
    assert!(report.warnings().is_empty(), "warnings: {:?}", report.warnings());
    assert_eq!(report.response().pki_status(), Some(PkiStatus::Success));
    assert_eq!(report.ca().chain().len(), 1);

    let received = test_ca.ca.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].message_type(), MessageType::PkcsReq);
    assert_eq!(received[0].transaction_id(), Some(report.transaction_id()));

    let key_der = report.key().public_key_der().unwrap();
    let issued = report.into_result().into_issued().unwrap();
    assert!(issued.matches_key());
    assert_eq!(
        issued.certificate().public_key().unwrap().public_key_to_der().unwrap(),
        key_der.to_vec()
    );

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("testcert.pem");
    issued.write_pem(&out).unwrap();
    let pem = std::fs::read_to_string(&out).unwrap();
    assert!(pem.starts_with("-----BEGIN CERTIFICATE-----"));

    let written = X509::from_pem(pem.as_bytes()).unwrap();
    let cn = written
        .subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_slice()
        .to_vec();
    assert_eq!(cn, b"test.testcorp.com");

    let dns_names: Vec<String> = written
        .subject_alt_names()
        .unwrap()
        .iter()
        .filter_map(|name| name.dnsname().map(|name| name.to_string()))
        .collect();
    assert_eq!(dns_names, vec!["test2.testcorp.com", "test3.testcorp.com"]);
}

#[tokio::test]
async fn enroll_with_ca_ra_chain() {
    let test_ca = TestCa::start(CaStub::new(), CaCertMode::Chain).await;
    let mut enrollment = test_ca.enrollment();

    let report = enrollment.enroll(&request()).await.unwrap();

    // The second certificate of the chain is the one requests go to.
    assert_eq!(report.ca().chain().len(), 2);
    assert_eq!(report.ca().certificate().to_der().unwrap(), test_ca.ca.ca_cert_der());
    assert!(report.warnings().is_empty());
    assert!(report.result().is_issued());
}

#[tokio::test]
async fn ca_cert_index_picks_chain_entry() {
    let test_ca = TestCa::start(CaStub::new(), CaCertMode::Chain).await;

    // Encrypting to the RA certificate means the CA cannot read the request.
    let client = test_ca.client().with_ca_cert_index(0);
    let mut enrollment = Enrollment::new(client, EnrollmentSettings::default());
    let err = enrollment.enroll(&request()).await.unwrap_err();
    assert_eq!(err.http_status(), Some(400));

    let client = test_ca.client().with_ca_cert_index(5);
    let mut enrollment = Enrollment::new(client, EnrollmentSettings::default());
    let err = enrollment.enroll(&request()).await.unwrap_err();
    assert!(matches!(err, Error::CaCertificateUnavailable(_)), "got: {}", err);
}

#[tokio::test]
async fn renewal_request() {
    let test_ca = TestCa::start(CaStub::new(), CaCertMode::Single).await;
    let mut enrollment = test_ca.enrollment();

    let report = enrollment.enroll(&request().renewal(true)).await.unwrap();
    assert!(report.result().is_issued());
    assert_eq!(test_ca.ca.received()[0].message_type(), MessageType::RenewalReq);
}

#[tokio::test]
async fn enroll_with_given_key() {
    let test_ca = TestCa::start(CaStub::new(), CaCertMode::Single).await;
    let mut enrollment = test_ca.enrollment();

    let key = KeyPair::generate().unwrap();
    let report = enrollment.enroll_with(&request(), key.clone()).await.unwrap();
    let issued = report.into_result().into_issued().unwrap();
    assert!(key.matches(issued.certificate()));
}

#[tokio::test]
async fn rejected_with_bad_time() {
    let ca = CaStub::new().with_behaviour(CaBehaviour::Reject {
        fail_info: FailInfo::BadTime,
        text: None,
    });
    let test_ca = TestCa::start(ca, CaCertMode::Single).await;
    let mut enrollment = test_ca.enrollment();

    let report = enrollment.enroll(&request()).await.unwrap();
    match report.result() {
        EnrollmentResult::Rejected(rejection) => {
            assert_eq!(rejection.fail_info(), Some(&FailInfo::BadTime));
        }
        other => panic!("expected rejection, got {}", other),
    }

    let err = report.into_result().into_issued().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Certificate issue failed: signingTime was not close enough to system time, re-issue the request"
    );
}

#[tokio::test]
async fn rejected_with_text() {
    let ca = CaStub::new().with_behaviour(CaBehaviour::Reject {
        fail_info: FailInfo::BadRequest,
        text: Some("template not allowed".to_string()),
    });
    let test_ca = TestCa::start(ca, CaCertMode::Single).await;
    let mut enrollment = test_ca.enrollment();

    let report = enrollment.enroll(&request()).await.unwrap();
    match report.result() {
        EnrollmentResult::Rejected(rejection) => {
            assert_eq!(rejection.text(), Some("template not allowed"));
            assert_eq!(
                rejection.to_string(),
                "Transaction not permitted or supported (template not allowed)"
            );
        }
        other => panic!("expected rejection, got {}", other),
    }
}

#[tokio::test]
async fn pending_then_poll() {
    let test_ca = TestCa::start(CaStub::new().with_behaviour(CaBehaviour::Pending), CaCertMode::Single).await;
    let mut enrollment = test_ca.enrollment();

    let pending = enrollment.enroll(&request()).await.unwrap();
    assert!(pending.result().is_pending());

    let report = enrollment.poll(&pending).await.unwrap();
    assert_eq!(report.transaction_id(), pending.transaction_id());
    assert!(report.warnings().is_empty());

    let issued = report.result().clone().into_issued().unwrap();
    assert!(issued.matches_key());
    assert!(pending.key().matches(issued.certificate()));

    let received = test_ca.ca.received();
    assert_eq!(received.len(), 2);
    assert_eq!(received[1].message_type(), MessageType::CertPoll);
    assert_eq!(received[0].transaction_id(), received[1].transaction_id());
    assert_ne!(received[0].sender_nonce(), received[1].sender_nonce());
}

#[tokio::test]
async fn nonce_mismatch_is_a_warning() {
    let test_ca = TestCa::start(
        CaStub::new().with_behaviour(CaBehaviour::WrongRecipientNonce),
        CaCertMode::Single,
    )
    .await;
    let mut enrollment = test_ca.enrollment();

    let report = enrollment.enroll(&request()).await.unwrap();
    assert!(report.result().is_issued());
    assert_eq!(report.warnings().len(), 1);
    assert!(matches!(
        report.warnings()[0],
        EnrollmentWarning::Correlation(CorrelationWarning::NonceMismatch { .. })
    ));
}

#[tokio::test]
async fn unexpected_message_type() {
    let ca = CaStub::new().with_behaviour(CaBehaviour::MessageType(MessageType::PkcsReq));
    let test_ca = TestCa::start(ca, CaCertMode::Single).await;

    let mut lenient = test_ca.enrollment();
    let report = lenient.enroll(&request()).await.unwrap();
    assert!(report.result().is_issued());
    assert_eq!(
        report.warnings(),
        &[EnrollmentWarning::UnexpectedMessageType(MessageType::PkcsReq)]
    );

    let settings = EnrollmentSettings {
        strict_message_type: true,
        ..EnrollmentSettings::default()
    };
    let mut strict = Enrollment::new(test_ca.client(), settings);
    let err = strict.enroll(&request()).await.unwrap_err();
    assert!(matches!(err, Error::UnexpectedMessageType(MessageType::PkcsReq)));
}

#[tokio::test]
async fn unknown_message_type() {
    let ca = CaStub::new().with_behaviour(CaBehaviour::MessageType(MessageType::Other("99".to_string())));
    let test_ca = TestCa::start(ca, CaCertMode::Single).await;

    let mut lenient = test_ca.enrollment();
    let report = lenient.enroll(&request()).await.unwrap();
    assert!(report.result().is_issued());
    assert_eq!(
        report.warnings(),
        &[EnrollmentWarning::UnexpectedMessageType(MessageType::Other("99".to_string()))]
    );
    assert_eq!(report.response().message_type().to_attribute_value(), "99");

    let settings = EnrollmentSettings {
        strict_message_type: true,
        ..EnrollmentSettings::default()
    };
    let mut strict = Enrollment::new(test_ca.client(), settings);
    let err = strict.enroll(&request()).await.unwrap_err();
    assert!(
        matches!(&err, Error::UnexpectedMessageType(MessageType::Other(code)) if code == "99"),
        "got: {}",
        err
    );
}

#[tokio::test]
async fn ca_certificate_with_wrong_content_type() {
    let test_ca = TestCa::start_with_ca_cert_response(
        ResponseTemplate::new(200).set_body_raw(b"<html>maintenance</html>".to_vec(), "text/html"),
    )
    .await;

    let err = test_ca.client().get_ca_certificate().await.unwrap_err();
    assert_eq!(err.http_status(), None);
    match err {
        Error::Transport(httpclient::Error::UnexpectedContentType(_, content_type)) => {
            assert_eq!(content_type.as_deref(), Some("text/html"));
        }
        other => panic!("expected unexpected content type, got {}", other),
    }

    // An enrollment stops before anything is submitted.
    let mut enrollment = test_ca.enrollment();
    let err = enrollment.enroll(&request()).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got: {}", err);
    assert!(test_ca.ca.received().is_empty());
}

#[tokio::test]
async fn ca_certificate_server_error_keeps_status_and_body() {
    let test_ca =
        TestCa::start_with_ca_cert_response(ResponseTemplate::new(500).set_body_string("ca unavailable")).await;

    let err = test_ca.client().get_ca_certificate().await.unwrap_err();
    assert_eq!(err.http_status(), Some(500));
    match err {
        Error::Transport(e) => assert_eq!(e.body(), Some("ca unavailable")),
        other => panic!("expected transport error, got {}", other),
    }
}

#[tokio::test]
async fn server_error_keeps_status_and_body() {
    let test_ca = TestCa::start_with_operation_response(
        CaStub::new(),
        ResponseTemplate::new(500).set_body_string("internal error"),
    )
    .await;
    let mut enrollment = test_ca.enrollment();

    let err = enrollment.enroll(&request()).await.unwrap_err();
    assert_eq!(err.http_status(), Some(500));
    match err {
        Error::Transport(e) => assert_eq!(e.body(), Some("internal error")),
        other => panic!("expected transport error, got {}", other),
    }
}

#[tokio::test]
async fn garbage_response_is_malformed() {
    let test_ca = TestCa::start_with_operation_response(
        CaStub::new(),
        ResponseTemplate::new(200).set_body_raw(b"<html>oops</html>".to_vec(), "text/html"),
    )
    .await;
    let mut enrollment = test_ca.enrollment();

    let err = enrollment.enroll(&request()).await.unwrap_err();
    assert!(matches!(err, Error::MalformedMessage(_)), "got: {}", err);
}

#[tokio::test]
async fn timeout_is_a_transport_error() {
    let test_ca = TestCa::start_with_operation_response(
        CaStub::new(),
        ResponseTemplate::new(200).set_delay(Duration::from_secs(5)),
    )
    .await;

    let client = test_ca.client().with_timeout(Duration::from_millis(500));
    let mut enrollment = Enrollment::new(client, EnrollmentSettings::default());

    let err = enrollment.enroll(&request()).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got: {}", err);
    assert_eq!(err.http_status(), None);
}

#[tokio::test]
async fn unreachable_ca() {
    let client = scepc::scep::ScepClient::new("http://127.0.0.1:1").unwrap();
    let err = client.get_ca_certificate().await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got: {}", err);
}
