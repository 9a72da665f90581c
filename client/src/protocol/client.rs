use std::fmt::{self, Display};
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use derive_builder::Builder;
use parking_lot::RwLock;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::{debug, warn};

use crate::protocol::report::{RelayReport, ReportError};
use crate::settings::Credentials;

pub const CONTROLLER_PATH: &str = "powercontroller.py";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("The request timed out: {0}")]
    Timeout(String),
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Invalid controller URL: {0}")]
    InvalidUrl(String),
    #[error("Unexpected response: {0}")]
    Report(#[from] ReportError),
    #[error("HTTP client setup failed: {0}")]
    Setup(String),
}

impl ClientError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ClientError::Timeout(error.to_string())
        } else {
            ClientError::Transport(error.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    On,
    Off,
    Status,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::On => "on",
            Action::Off => "off",
            Action::Status => "status",
        }
    }
}

impl From<bool> for Action {
    fn from(on: bool) -> Self {
        if on { Action::On } else { Action::Off }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scheme {
    #[default]
    Https,
    Http,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Https => "https",
            Scheme::Http => "http",
        }
    }
}

#[derive(Builder, Debug, Clone)]
pub struct RelayOptions {
    pub credentials: Credentials,
    #[builder(default)]
    pub scheme: Scheme,
    #[builder(default = "DEFAULT_TIMEOUT")]
    pub timeout: Duration,
}

impl RelayOptions {
    pub fn builder() -> RelayOptionsBuilder {
        RelayOptionsBuilder::default()
    }
}

pub fn basic_auth_header(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// HTTP client for the relay controller.
///
/// Certificates are not validated: home controllers ship self-signed ones.
#[derive(Clone)]
pub struct RelayClient {
    http: Client,
    scheme: Scheme,
    credentials: Arc<RwLock<Credentials>>,
}

impl RelayClient {
    pub fn new(options: RelayOptions) -> Result<Self, ClientError> {
        let http = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(options.timeout)
            .build()
            .map_err(|e| ClientError::Setup(e.to_string()))?;
        Ok(Self {
            http,
            scheme: options.scheme,
            credentials: Arc::new(RwLock::new(options.credentials)),
        })
    }

    pub fn credentials(&self) -> Credentials {
        self.credentials.read().clone()
    }

    /// Replaces the host and login used by every following request.
    pub fn set_credentials(&self, credentials: Credentials) {
        *self.credentials.write() = credentials;
    }

    pub fn build_url(&self, switch: &str, action: Action) -> Result<Url, ClientError> {
        controller_url(self.scheme, &self.credentials().host, switch, action)
    }

    /// Sends one action for one switch and returns the raw response body.
    ///
    /// The HTTP status code is not interpreted: whatever body comes back is
    /// handed to the caller.
    pub async fn send(&self, switch: &str, action: Action) -> Result<Vec<u8>, ClientError> {
        // one snapshot, so host and login always belong together
        let credentials = self.credentials();
        let url = controller_url(self.scheme, &credentials.host, switch, action)?;
        let auth = basic_auth_header(&credentials.username, &credentials.password);
        debug!("Sending {action} for {switch} to {url}");
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, auth)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Controller answered {status} to {action} for {switch}");
        }
        let body = response.bytes().await?;
        Ok(body.to_vec())
    }

    /// Like [`RelayClient::send`], then parses the body as a [`RelayReport`].
    pub async fn request(&self, switch: &str, action: Action) -> Result<RelayReport, ClientError> {
        let body = self.send(switch, action).await?;
        RelayReport::parse(&body).map_err(|e| {
            debug!("Unparsable body for {switch}: {}", String::from_utf8_lossy(&body));
            ClientError::from(e)
        })
    }
}

fn controller_url(
    scheme: Scheme,
    host: &str,
    switch: &str,
    action: Action,
) -> Result<Url, ClientError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(ClientError::InvalidUrl("no host configured".to_string()));
    }
    let base = format!("{}://{host}/{CONTROLLER_PATH}", scheme.as_str());
    let mut url =
        Url::parse(&base).map_err(|e| ClientError::InvalidUrl(format!("{base}: {e}")))?;
    // a host carrying a path, query or fragment would move the request elsewhere
    if url.host_str().is_none_or(str::is_empty)
        || url.path() != format!("/{CONTROLLER_PATH}")
        || url.query().is_some()
        || url.fragment().is_some()
    {
        return Err(ClientError::InvalidUrl(base));
    }
    url.query_pairs_mut()
        .append_pair("switch", switch)
        .append_pair("action", action.as_str());
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helper::{MockController, Reply};

    fn client(host: &str) -> RelayClient {
        let options = RelayOptions::builder()
            .credentials(Credentials {
                host: host.to_string(),
                username: "admin".to_string(),
                password: "s3cret".to_string(),
            })
            .scheme(Scheme::Http)
            .build()
            .unwrap();
        RelayClient::new(options).unwrap()
    }

    #[test]
    fn test_basic_auth_header() {
        assert_eq!(
            basic_auth_header("Aladdin", "open sesame"),
            "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        );
    }

    #[test]
    fn test_build_url() {
        let url = client("192.168.1.20")
            .build_url("Switch 1", Action::Status)
            .unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.path(), "/powercontroller.py");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("switch".to_string(), "Switch 1".to_string()),
                ("action".to_string(), "status".to_string()),
            ]
        );
    }

    #[test]
    fn test_default_scheme_is_https() {
        let options = RelayOptions::builder()
            .credentials(Credentials {
                host: "garden.local".to_string(),
                ..Default::default()
            })
            .build()
            .unwrap();
        assert_eq!(options.timeout, DEFAULT_TIMEOUT);
        let url = RelayClient::new(options)
            .unwrap()
            .build_url("Front", Action::On)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://garden.local/powercontroller.py?switch=Front&action=on"
        );
    }

    #[test]
    fn test_empty_host_is_invalid() {
        assert!(matches!(
            client("").build_url("Switch 1", Action::On),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_host_must_be_a_bare_authority() {
        for host in ["   ", "/", "evil.example/x", "garden.local?x=1", "garden.local#top", "user@"] {
            assert!(
                matches!(
                    client(host).build_url("Switch 1", Action::Status),
                    Err(ClientError::InvalidUrl(_))
                ),
                "{host:?} should be rejected"
            );
        }
        let url = client(" 10.0.0.5:8080 ")
            .build_url("Switch 1", Action::Status)
            .unwrap();
        assert_eq!(url.host_str(), Some("10.0.0.5"));
    }

    #[tokio::test]
    async fn test_empty_host_sends_nothing() {
        assert!(matches!(
            client("").send("Switch 1", Action::Status).await,
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_send_pairs_host_and_login_from_one_snapshot() {
        let server = MockController::echo().await;
        let client = client("old.invalid");
        client.set_credentials(Credentials {
            host: server.host(),
            username: "new".to_string(),
            password: "login".to_string(),
        });
        client.send("Switch 1", Action::Status).await.unwrap();
        assert_eq!(
            server.requests()[0].header("authorization"),
            Some(basic_auth_header("new", "login").as_str())
        );
    }

    #[tokio::test]
    async fn test_request_reports_unparsable_body() {
        let server = MockController::start(|_| Reply::Json("<html>401</html>".to_string())).await;
        let client = client(&server.host());
        assert!(matches!(
            client.request("Switch 1", Action::Status).await,
            Err(ClientError::Report(_))
        ));

        let echo = MockController::echo().await;
        let report = self::client(&echo.host())
            .request("Switch 2", Action::On)
            .await
            .unwrap();
        assert!(report.matches("switch 2"));
        assert!(report.is_on());
    }

    #[test]
    fn test_set_credentials() {
        let client = client("old.local");
        client.set_credentials(Credentials {
            host: "new.local:8443".to_string(),
            username: "u".to_string(),
            password: "p".to_string(),
        });
        let url = client.build_url("Switch 2", Action::Off).unwrap();
        assert_eq!(url.host_str(), Some("new.local"));
        assert_eq!(url.port(), Some(8443));
    }

    #[test]
    fn test_action_from_toggle() {
        assert_eq!(Action::from(true), Action::On);
        assert_eq!(Action::from(false), Action::Off);
        assert_eq!(Action::Status.to_string(), "status");
    }

    #[tokio::test]
    async fn test_send_attaches_basic_auth() {
        let server = MockController::echo().await;
        let client = client(&server.host());
        let body = client.send("Switch 3", Action::On).await.unwrap();
        assert_eq!(
            String::from_utf8(body).unwrap(),
            r#"{"relay":"Switch 3","status":"on"}"#
        );

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].header("authorization"),
            Some(basic_auth_header("admin", "s3cret").as_str())
        );
        assert_eq!(requests[0].query("switch").as_deref(), Some("Switch 3"));
        assert_eq!(requests[0].query("action").as_deref(), Some("on"));
    }
}
