//! Some helper functions for HTTP calls
use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};

use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT},
    Response, StatusCode,
};

use crate::{
    commons::util::{file, is_local_https_uri},
    constants::{SCEPC_HTTPS_ROOT_CERTS_ENV, SCEPC_VERSION},
};

//------------ BinaryResponse ------------------------------------------------

/// The body of a 200 OK response together with its media type.
#[derive(Clone, Debug)]
pub struct BinaryResponse {
    content_type: Option<String>,
    body: Bytes,
}

impl BinaryResponse {
    /// The media type without parameters, lower case.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    async fn from_res(uri: &str, res: Response) -> Result<Self, Error> {
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase());

        let body = res
            .bytes()
            .await
            .map_err(|e| Error::response(uri, format!("cannot get body: {}", e)))?;

        Ok(BinaryResponse { content_type, body })
    }
}

/// Performs a GET and expects a binary response.
///
/// Note: the body may be empty if the CA answered 200 OK without content.
pub async fn get_binary(uri: &str, timeout: Duration) -> Result<BinaryResponse, Error> {
    let res = client_with_tweaks(uri, timeout)?
        .get(uri)
        .headers(headers(uri, None)?)
        .send()
        .await
        .map_err(|e| Error::execute(uri, e))?;

    match res.status() {
        StatusCode::OK => BinaryResponse::from_res(uri, res).await,
        _ => Err(Error::from_res(uri, res).await),
    }
}

/// Posts binary data, and expects a binary response. Includes the full scepc
/// version as the user agent.
pub async fn post_binary(
    uri: &str,
    data: &Bytes,
    content_type: &str,
    timeout: Duration,
) -> Result<BinaryResponse, Error> {
    let res = client_with_tweaks(uri, timeout)?
        .post(uri)
        .headers(headers(uri, Some(content_type))?)
        .body(data.clone())
        .send()
        .await
        .map_err(|e| Error::execute(uri, e))?;

    match res.status() {
        StatusCode::OK => BinaryResponse::from_res(uri, res).await,
        _ => Err(Error::from_res(uri, res).await),
    }
}

#[allow(clippy::result_large_err)]
fn load_root_cert(path_str: &str) -> Result<reqwest::Certificate, Error> {
    let path = PathBuf::from_str(path_str).map_err(|e| Error::request_build_https_cert(path_str, e))?;
    let file = file::read(&path).map_err(|e| Error::request_build_https_cert(path_str, e))?;
    reqwest::Certificate::from_pem(file.as_ref()).map_err(|e| Error::request_build_https_cert(path_str, e))
}

/// Client with the given timeout and any extra HTTPS trust anchors.
///
/// Invalid certificates are accepted for HTTPS URIs on this machine only,
/// so that a local test CA can be used.
#[allow(clippy::result_large_err)]
pub fn client_with_tweaks(uri: &str, timeout: Duration) -> Result<reqwest::Client, Error> {
    let mut builder = reqwest::ClientBuilder::new().timeout(timeout);

    if let Ok(cert_list) = env::var(SCEPC_HTTPS_ROOT_CERTS_ENV) {
        for path in cert_list.split(':').filter(|path| !path.is_empty()) {
            let cert = load_root_cert(path)?;
            builder = builder.add_root_certificate(cert);
        }
    }

    if is_local_https_uri(uri) {
        builder.danger_accept_invalid_certs(true).build()
    } else {
        builder.build()
    }
    .map_err(|e| Error::request_build(uri, e))
}

#[allow(clippy::result_large_err)]
fn headers(uri: &str, content_type: Option<&str>) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();

    let ua_string = format!("scepc/{}", SCEPC_VERSION);
    let user_agent_value = HeaderValue::from_str(&ua_string).map_err(|e| Error::request_build(uri, e))?;
    headers.insert(USER_AGENT, user_agent_value);

    if let Some(content_type) = content_type {
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(content_type).map_err(|e| Error::request_build(uri, e))?,
        );
    }
    Ok(headers)
}

//------------ Error ---------------------------------------------------------

type ErrorUri = String;
type RootCertPath = String;
type ErrorMessage = String;

#[derive(Debug)]
pub enum Error {
    RequestBuild(ErrorUri, ErrorMessage),
    RequestBuildHttpsCert(RootCertPath, ErrorMessage),

    RequestExecute(ErrorUri, ErrorMessage),

    Response(ErrorUri, ErrorMessage),
    ErrorResponseWithBody(ErrorUri, StatusCode, String),
    UnexpectedContentType(ErrorUri, Option<String>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::RequestBuild(uri, msg) => write!(f, "Issue creating request for URI: {}, error: {}", uri, msg),
            Error::RequestBuildHttpsCert(path, msg) => {
                write!(f, "Cannot use configured HTTPS root cert '{}'. Error: {}", path, msg)
            }

            Error::RequestExecute(uri, msg) => write!(f, "Issue accessing URI: {}, error: {}", uri, msg),

            Error::Response(uri, msg) => write!(f, "Issue processing response from URI: {}, error: {}", uri, msg),
            Error::ErrorResponseWithBody(uri, code, body) => {
                write!(f, "Error response from URI: {}, Status: {}, Body: {}", uri, code, body)
            }
            Error::UnexpectedContentType(uri, content_type) => match content_type {
                Some(content_type) => write!(f, "Unexpected content type '{}' from URI: {}", content_type, uri),
                None => write!(f, "Missing content type in response from URI: {}", uri),
            },
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn request_build(uri: &str, msg: impl fmt::Display) -> Self {
        Error::RequestBuild(uri.to_string(), msg.to_string())
    }

    pub fn request_build_https_cert(path: &str, msg: impl fmt::Display) -> Self {
        Error::RequestBuildHttpsCert(path.to_string(), msg.to_string())
    }

    pub fn execute(uri: &str, msg: impl fmt::Display) -> Self {
        Error::RequestExecute(uri.to_string(), msg.to_string())
    }

    pub fn response(uri: &str, msg: impl fmt::Display) -> Self {
        Error::Response(uri.to_string(), msg.to_string())
    }

    pub fn unexpected_content_type(uri: &str, content_type: Option<&str>) -> Self {
        Error::UnexpectedContentType(uri.to_string(), content_type.map(|s| s.to_string()))
    }

    /// The HTTP status of an error response, if that is what this is.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::ErrorResponseWithBody(_, status, _) => Some(*status),
            _ => None,
        }
    }

    /// The body of an error response, if that is what this is.
    pub fn body(&self) -> Option<&str> {
        match self {
            Error::ErrorResponseWithBody(_, _, body) => Some(body.as_str()),
            _ => None,
        }
    }

    /// A non-200 response. The body is kept verbatim as plain text, even
    /// if it is empty.
    async fn from_res(uri: &str, res: Response) -> Error {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        Error::ErrorResponseWithBody(uri.to_string(), status, body)
    }
}

//------------ Tests ---------------------------------------------------------
