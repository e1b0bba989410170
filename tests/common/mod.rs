//! A SCEP CA on a wiremock server, backed by [`CaStub`].
#![allow(dead_code)]

use std::sync::Arc;

use scepc::constants::{CONTENT_TYPE_CA_CERT, CONTENT_TYPE_CA_RA_CERT, CONTENT_TYPE_PKI_MESSAGE};
use scepc::scep::{Enrollment, EnrollmentSettings, ScepClient};
use scepc::test::CaStub;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const SCEP_PATH: &str = "/certsrv/mscep/";

/// What GetCACert returns.
#[derive(Clone, Copy, Debug)]
pub enum CaCertMode {
    Single,
    Chain,
}

pub struct TestCa {
    pub server: MockServer,
    pub ca: Arc<CaStub>,
}

impl TestCa {
    /// Starts a server that answers GetCACert and PKIOperation.
    pub async fn start(ca: CaStub, mode: CaCertMode) -> Self {
        let server = MockServer::start().await;
        let ca = Arc::new(ca);

        mount_ca_cert(&server, &ca, mode).await;

        let responder = ca.clone();
        Mock::given(method("POST"))
            .and(path(SCEP_PATH))
            .and(query_param("operation", "PKIOperation"))
            .respond_with(move |req: &Request| match responder.handle_pki_operation(&req.body) {
                Ok(body) => ResponseTemplate::new(200).set_body_raw(body.to_vec(), CONTENT_TYPE_PKI_MESSAGE),
                Err(e) => ResponseTemplate::new(400).set_body_string(e),
            })
            .mount(&server)
            .await;

        TestCa { server, ca }
    }

    /// Starts a server that answers GetCACert, but gives the given response
    /// to every PKIOperation.
    pub async fn start_with_operation_response(ca: CaStub, response: ResponseTemplate) -> Self {
        let server = MockServer::start().await;
        let ca = Arc::new(ca);

        mount_ca_cert(&server, &ca, CaCertMode::Single).await;
        Mock::given(method("POST"))
            .and(path(SCEP_PATH))
            .and(query_param("operation", "PKIOperation"))
            .respond_with(response)
            .mount(&server)
            .await;

        TestCa { server, ca }
    }

    /// Starts a server that gives the given response to GetCACert and
    /// answers nothing else.
    pub async fn start_with_ca_cert_response(response: ResponseTemplate) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SCEP_PATH))
            .and(query_param("operation", "GetCACert"))
            .respond_with(response)
            .mount(&server)
            .await;

        TestCa {
            server,
            ca: Arc::new(CaStub::new()),
        }
    }

    pub fn client(&self) -> ScepClient {
        ScepClient::new(&self.server.uri()).unwrap()
    }

    pub fn enrollment(&self) -> Enrollment {
        Enrollment::new(self.client(), EnrollmentSettings::default())
    }
}

async fn mount_ca_cert(server: &MockServer, ca: &CaStub, mode: CaCertMode) {
    let response = match mode {
        CaCertMode::Single => ResponseTemplate::new(200).set_body_raw(ca.ca_cert_der(), CONTENT_TYPE_CA_CERT),
        CaCertMode::Chain => ResponseTemplate::new(200).set_body_raw(ca.ca_ra_chain().to_vec(), CONTENT_TYPE_CA_RA_CERT),
    };

    Mock::given(method("GET"))
        .and(path(SCEP_PATH))
        .and(query_param("operation", "GetCACert"))
        .respond_with(response)
        .mount(server)
        .await;
}
