//! HTTP transport to the AAP REST API.
//!
//! Resources talk to the server through the [`ProviderHttpClient`] trait so
//! they can be exercised against an in-memory fake in tests; [`AapClient`] is
//! the real implementation on top of `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use tracing::{debug, instrument};
use url::Url;

use crate::error::ProviderError;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Status code and raw body of an API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Return the body if the status is one of `expected`.
    pub fn expect_status(self, expected: &[u16]) -> Result<Vec<u8>, ProviderError> {
        if expected.contains(&self.status) {
            Ok(self.body)
        } else {
            Err(ProviderError::UnexpectedStatus {
                status: self.status,
                body: String::from_utf8_lossy(&self.body).into_owned(),
            })
        }
    }
}

/// Sends requests to the AAP server.
#[async_trait]
pub trait ProviderHttpClient: Send + Sync {
    /// Send `body` (JSON bytes) with `method` to `path`, relative to the host URL.
    async fn do_request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse, ProviderError>;
}

/// Client for an AAP server using HTTP basic auth.
#[derive(Clone)]
pub struct AapClient {
    host_url: Url,
    username: Option<String>,
    password: Option<String>,
    http: reqwest::Client,
}

impl std::fmt::Debug for AapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AapClient")
            .field("host_url", &self.host_url.as_str())
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AapClient {
    /// Build a client for `host`.
    ///
    /// Credentials are only sent when both `username` and `password` are set.
    /// `insecure_skip_verify` disables TLS certificate verification.
    pub fn new(
        host: &str,
        username: Option<String>,
        password: Option<String>,
        insecure_skip_verify: bool,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let mut host = host.trim().to_string();
        if !host.ends_with('/') {
            host.push('/');
        }
        let host_url = Url::parse(&host)
            .map_err(|e| ProviderError::Configuration(format!("invalid host '{}': {}", host, e)))?;

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure_skip_verify)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            host_url,
            username,
            password,
            http,
        })
    }

    /// The host URL, always ending in `/`.
    pub fn host_url(&self) -> &str {
        self.host_url.as_str()
    }

    /// Resolve `path` against the host URL.
    ///
    /// The result always ends in `/`, which the AAP API expects.
    pub fn compute_url_path(&self, path: &str) -> Result<Url, ProviderError> {
        let mut url = self.host_url.join(path.trim_start_matches('/'))?;
        if !url.path().ends_with('/') {
            let with_slash = format!("{}/", url.path());
            url.set_path(&with_slash);
        }
        Ok(url)
    }
}

#[async_trait]
impl ProviderHttpClient for AapClient {
    #[instrument(skip(self, method, body), fields(method = %method))]
    async fn do_request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse, ProviderError> {
        let url = self.compute_url_path(path)?;
        let mut request = self
            .http
            .request(method, url.clone())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            request = request.basic_auth(username, Some(password));
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        debug!(url = %url, status, bytes = body.len(), "request completed");
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(host: &str) -> AapClient {
        AapClient::new(host, None, None, false, DEFAULT_TIMEOUT).unwrap()
    }

    #[test]
    fn test_host_url_gets_trailing_slash() {
        assert_eq!(
            client("https://aap.example.com").host_url(),
            "https://aap.example.com/"
        );
        assert_eq!(
            client("https://aap.example.com/controller/").host_url(),
            "https://aap.example.com/controller/"
        );
    }

    #[test]
    fn test_compute_url_path() {
        let c = client("https://aap.example.com/controller");
        assert_eq!(
            c.compute_url_path("api/v2/inventories").unwrap().as_str(),
            "https://aap.example.com/controller/api/v2/inventories/"
        );
        assert_eq!(
            c.compute_url_path("/api/v2/inventories/4/").unwrap().as_str(),
            "https://aap.example.com/controller/api/v2/inventories/4/"
        );
    }

    #[test]
    fn test_invalid_host_is_configuration_error() {
        let err = AapClient::new("not a url", None, None, false, DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_debug_redacts_password() {
        let c = AapClient::new(
            "https://aap.example.com",
            Some("admin".to_string()),
            Some("hunter2".to_string()),
            false,
            DEFAULT_TIMEOUT,
        )
        .unwrap();
        let debug = format!("{:?}", c);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_expect_status() {
        let ok = HttpResponse::new(201, b"{}".to_vec());
        assert_eq!(ok.expect_status(&[200, 201]).unwrap(), b"{}".to_vec());

        let err = HttpResponse::new(400, "bad").expect_status(&[200]).unwrap_err();
        assert!(matches!(
            err,
            ProviderError::UnexpectedStatus { status: 400, ref body } if body == "bad"
        ));
    }

    #[tokio::test]
    async fn test_do_request_sends_basic_auth_and_json_headers() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v2/inventories/")
                    .header("authorization", "Basic YWRtaW46c2VjcmV0")
                    .header("accept", "application/json")
                    .header("content-type", "application/json")
                    .body(r#"{"name":"web"}"#);
                then.status(201).body(r#"{"id":3}"#);
            })
            .await;

        let c = AapClient::new(
            &server.base_url(),
            Some("admin".to_string()),
            Some("secret".to_string()),
            false,
            DEFAULT_TIMEOUT,
        )
        .unwrap();
        let response = c
            .do_request(
                Method::POST,
                "api/v2/inventories",
                Some(br#"{"name":"web"}"#.to_vec()),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 201);
        assert_eq!(response.body, br#"{"id":3}"#.to_vec());
    }

    #[tokio::test]
    async fn test_do_request_returns_error_statuses() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v2/inventories/99/");
                then.status(404).body(r#"{"detail":"Not found."}"#);
            })
            .await;

        let response = client(&server.base_url())
            .do_request(Method::GET, "api/v2/inventories/99", None)
            .await
            .unwrap();
        assert_eq!(response.status, 404);
    }
}
