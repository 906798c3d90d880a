//! MockServer REST client.
//!
//! All operations go through [`MockServerClient::send`], which owns the transport call, the
//! timeout, and the mapping of every outcome onto [`MockServerError`].

use crate::error::{ErrorKind, MockServerError, Result};
use crate::model::{
    ClearScope, Expectation, RecordedRequest, RequestMatcher, ServerStatus, VerificationResult,
    VerificationTimes, WireVerificationTimes,
};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 1080;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Placeholder used when a failed response's body cannot be read.
const UNREADABLE_BODY: &str = "<unreadable response body>";

/// Endpoint configuration. Immutable once the client is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Per-call budget. `None` means [`DEFAULT_TIMEOUT`].
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Expectation,
    Verify,
    Clear,
    Reset,
    Retrieve,
    Status,
}

impl Endpoint {
    fn path(self) -> &'static str {
        match self {
            Self::Expectation => "/mockserver/expectation",
            Self::Verify => "/mockserver/verify",
            Self::Clear => "/mockserver/clear",
            Self::Reset => "/mockserver/reset",
            Self::Retrieve => "/mockserver/retrieve",
            Self::Status => "/mockserver/status",
        }
    }

    /// Failure kinds the calling operation turns into a normal answer, so they are not
    /// worth a warning.
    fn absorbs(self, kind: ErrorKind) -> bool {
        match self {
            Self::Status => kind.is_unreachable(),
            Self::Verify => kind == ErrorKind::VerificationMismatch,
            _ => false,
        }
    }

    /// Status that carries a domain answer rather than a failure.
    fn mismatch_status(self) -> Option<StatusCode> {
        match self {
            Self::Verify => Some(StatusCode::NOT_ACCEPTABLE),
            _ => None,
        }
    }
}

/// Body of a successful response.
#[derive(Debug, Clone, PartialEq)]
enum ResponsePayload {
    /// Parsed JSON. An empty body is an empty object.
    Json(Value),
    /// Non-empty body that is not valid JSON.
    Text(String),
}

impl ResponsePayload {
    fn from_text(text: String) -> Self {
        if text.trim().is_empty() {
            return Self::Json(Value::Object(Map::new()));
        }
        match serde_json::from_str(&text) {
            Ok(v) => Self::Json(v),
            Err(_) => Self::Text(text),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MatcherBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    http_request: Option<&'a RequestMatcher>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyBody<'a> {
    http_request: &'a RequestMatcher,
    times: WireVerificationTimes,
}

/// Client for a single MockServer instance.
///
/// Cheap to clone and safe to share across tasks: it holds no mutable state, and every call
/// carries its own timeout.
#[derive(Debug, Clone)]
pub struct MockServerClient {
    inner: Arc<MockServerClientInner>,
}

#[derive(Debug)]
struct MockServerClientInner {
    host: String,
    port: u16,
    base_url: Url,
    timeout: Duration,
    http: Client,
}

impl MockServerClient {
    /// Build a client for `http://{host}:{port}`. No network activity happens here.
    ///
    /// # Errors
    ///
    /// Returns [`MockServerError::InvalidParameters`] if the port is 0 or the host does not form
    /// a valid URL, and [`MockServerError::Unknown`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let ClientConfig {
            host,
            port,
            timeout,
        } = config;

        if port == 0 {
            return Err(MockServerError::InvalidParameters(
                "port must be between 1 and 65535".to_string(),
            ));
        }

        let base_url = Url::parse(&format!("http://{}:{port}", url_host(&host))).map_err(|e| {
            MockServerError::InvalidParameters(format!("Invalid MockServer host '{host}': {e}"))
        })?;

        let http = Client::builder()
            .build()
            .map_err(|e| MockServerError::Unknown(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(MockServerClientInner {
                host,
                port,
                base_url,
                timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
                http,
            }),
        })
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.inner.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.port
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// `http://{host}:{port}`, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.inner.base_url.as_str().trim_end_matches('/')
    }

    /// Install one expectation.
    ///
    /// # Errors
    ///
    /// Any transport failure or non-2xx status.
    pub async fn create_expectation(&self, expectation: &Expectation) -> Result<()> {
        self.send(Endpoint::Expectation, expectation, &[]).await?;
        debug!(
            request = %expectation.http_request.describe(),
            id = expectation.id.as_deref().unwrap_or(""),
            "expectation created"
        );
        Ok(())
    }

    /// Ask MockServer whether requests matching `matcher` were received.
    ///
    /// A 406 answer is a negative result, not an error. On success the matched count is taken
    /// from `times` (see [`VerificationTimes::reported_count`]).
    ///
    /// # Errors
    ///
    /// Any transport failure or non-2xx status other than 406.
    pub async fn verify(
        &self,
        matcher: &RequestMatcher,
        times: Option<VerificationTimes>,
    ) -> Result<VerificationResult> {
        let times = times.unwrap_or_default();
        let body = VerifyBody {
            http_request: matcher,
            times: times.to_wire(),
        };

        match self.send(Endpoint::Verify, &body, &[]).await {
            Ok(_) => Ok(VerificationResult {
                success: true,
                matched_count: times.reported_count(),
                message: None,
            }),
            Err(err @ MockServerError::VerificationMismatch { .. }) => Ok(VerificationResult {
                success: false,
                matched_count: 0,
                message: Some(err.to_string()),
            }),
            Err(err) => Err(err),
        }
    }

    /// Remove expectations and recorded requests matching `matcher` (everything if `None`).
    ///
    /// # Errors
    ///
    /// Any transport failure or non-2xx status.
    pub async fn clear(&self, matcher: Option<&RequestMatcher>) -> Result<()> {
        self.clear_scoped(matcher, ClearScope::All).await
    }

    /// Like [`Self::clear`], limited to expectations or to the request log.
    ///
    /// # Errors
    ///
    /// Any transport failure or non-2xx status.
    pub async fn clear_scoped(
        &self,
        matcher: Option<&RequestMatcher>,
        scope: ClearScope,
    ) -> Result<()> {
        let body = MatcherBody {
            http_request: matcher,
        };
        let query: Vec<(&str, &str)> = scope
            .query_hint()
            .map(|t| vec![("type", t)])
            .unwrap_or_default();
        self.send(Endpoint::Clear, &body, &query).await?;
        Ok(())
    }

    /// Wipe all expectations and the whole request log.
    ///
    /// # Errors
    ///
    /// Any transport failure or non-2xx status.
    pub async fn reset(&self) -> Result<()> {
        self.send(Endpoint::Reset, &json!({}), &[]).await?;
        Ok(())
    }

    /// Requests MockServer has recorded, optionally filtered. Never absent: empty when none.
    ///
    /// # Errors
    ///
    /// Any transport failure, non-2xx status, or a body that is not a list of requests.
    pub async fn retrieve_recorded_requests(
        &self,
        matcher: Option<&RequestMatcher>,
    ) -> Result<Vec<RecordedRequest>> {
        let body = MatcherBody {
            http_request: matcher,
        };
        let payload = self
            .send(Endpoint::Retrieve, &body, &[("type", "REQUESTS")])
            .await?;
        decode_list(payload, "recorded requests")
    }

    /// Expectations currently active on MockServer, optionally filtered.
    ///
    /// # Errors
    ///
    /// Any transport failure, non-2xx status, or a body that is not a list of expectations.
    pub async fn retrieve_active_expectations(
        &self,
        matcher: Option<&RequestMatcher>,
    ) -> Result<Vec<Expectation>> {
        let body = MatcherBody {
            http_request: matcher,
        };
        let payload = self
            .send(Endpoint::Retrieve, &body, &[("type", "ACTIVE_EXPECTATIONS")])
            .await?;
        decode_list(payload, "active expectations")
    }

    /// Probe reachability. Connection failures and timeouts yield `reachable: false`.
    ///
    /// # Errors
    ///
    /// Failures other than connection-failed / connection-timeout (e.g. a non-2xx status).
    pub async fn status(&self) -> Result<ServerStatus> {
        match self.send(Endpoint::Status, &json!({}), &[]).await {
            Ok(payload) => {
                let (version, ports) = match &payload {
                    ResponsePayload::Json(v) => (
                        v.get("version").and_then(Value::as_str).map(str::to_string),
                        v.get("ports")
                            .and_then(Value::as_array)
                            .map(|ports| {
                                ports
                                    .iter()
                                    .filter_map(Value::as_u64)
                                    .filter_map(|p| u16::try_from(p).ok())
                                    .collect()
                            })
                            .unwrap_or_default(),
                    ),
                    ResponsePayload::Text(_) => (None, Vec::new()),
                };
                Ok(ServerStatus {
                    host: self.inner.host.clone(),
                    port: self.inner.port,
                    reachable: true,
                    version,
                    ports,
                })
            }
            Err(err) if err.kind().is_unreachable() => {
                debug!(base_url = %self.base_url(), error = %err, "mockserver not reachable");
                Ok(ServerStatus {
                    host: self.inner.host.clone(),
                    port: self.inner.port,
                    reachable: false,
                    version: None,
                    ports: Vec::new(),
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn send<T: Serialize + ?Sized>(
        &self,
        endpoint: Endpoint,
        payload: &T,
        query: &[(&str, &str)],
    ) -> Result<ResponsePayload> {
        let url = self.url(endpoint, query)?;
        debug!(method = "PUT", url = %url, "mockserver request");

        // The per-request timeout covers connect, send and body read; reqwest drops the
        // in-flight exchange when it fires.
        let response = self
            .inner
            .http
            .put(url)
            .json(payload)
            .timeout(self.inner.timeout)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(endpoint, &e))?;

        let status = response.status();
        if status.is_success() {
            let text = response
                .text()
                .await
                .map_err(|e| self.classify_transport_error(endpoint, &e))?;
            return Ok(ResponsePayload::from_text(text));
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| UNREADABLE_BODY.to_string());
        if endpoint.mismatch_status() == Some(status) {
            return Err(MockServerError::VerificationMismatch { body });
        }

        warn!(
            endpoint = endpoint.path(),
            status = status.as_u16(),
            "mockserver returned an error status"
        );
        Err(MockServerError::Remote {
            status: status.as_u16(),
            body,
        })
    }

    fn url(&self, endpoint: Endpoint, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.inner.base_url.join(endpoint.path()).map_err(|e| {
            MockServerError::Unknown(format!(
                "join base url with path '{}': {e}",
                endpoint.path()
            ))
        })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter().copied());
        }
        Ok(url)
    }

    fn classify_transport_error(
        &self,
        endpoint: Endpoint,
        err: &reqwest::Error,
    ) -> MockServerError {
        let classified = match transport_failure_class(err) {
            TransportFailure::Timeout => MockServerError::ConnectionTimeout {
                base_url: self.base_url().to_string(),
                timeout_ms: u64::try_from(self.inner.timeout.as_millis()).unwrap_or(u64::MAX),
            },
            TransportFailure::Network => MockServerError::ConnectionFailed {
                base_url: self.base_url().to_string(),
                message: error_chain(err),
            },
            TransportFailure::Other => MockServerError::Unknown(error_chain(err)),
        };
        if endpoint.absorbs(classified.kind()) {
            debug!(
                endpoint = endpoint.path(),
                kind = %classified.kind(),
                error = %err,
                "mockserver request failed"
            );
        } else {
            warn!(
                endpoint = endpoint.path(),
                kind = %classified.kind(),
                error = %err,
                "mockserver request failed"
            );
        }
        classified
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransportFailure {
    Timeout,
    Network,
    Other,
}

fn transport_failure_class(err: &reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        return TransportFailure::Timeout;
    }
    if err.is_connect() {
        return TransportFailure::Network;
    }

    let mut source = std::error::Error::source(err);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            use std::io::ErrorKind as K;
            match io.kind() {
                K::TimedOut => return TransportFailure::Timeout,
                K::ConnectionRefused
                | K::ConnectionReset
                | K::ConnectionAborted
                | K::NotConnected
                | K::AddrNotAvailable
                | K::BrokenPipe
                | K::UnexpectedEof
                | K::HostUnreachable
                | K::NetworkUnreachable => return TransportFailure::Network,
                _ => {}
            }
        }
        source = e.source();
    }

    // Protocol errors (e.g. a peer that does not speak HTTP) are not connection failures.
    TransportFailure::Other
}

/// IPv6 literals go in brackets inside a URL authority.
fn url_host(host: &str) -> Cow<'_, str> {
    if host.contains(':') && !host.starts_with('[') {
        Cow::Owned(format!("[{host}]"))
    } else {
        Cow::Borrowed(host)
    }
}

fn error_chain(err: &reqwest::Error) -> String {
    let mut msg = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(e) = source {
        msg.push_str(": ");
        msg.push_str(&e.to_string());
        source = e.source();
    }
    msg
}

fn decode_list<T: DeserializeOwned>(payload: ResponsePayload, what: &str) -> Result<Vec<T>> {
    match payload {
        ResponsePayload::Json(Value::Array(items)) => serde_json::from_value(Value::Array(items))
            .map_err(|e| MockServerError::Unknown(format!("failed to decode {what}: {e}"))),
        ResponsePayload::Json(Value::Null) => Ok(Vec::new()),
        ResponsePayload::Json(Value::Object(obj)) if obj.is_empty() => Ok(Vec::new()),
        ResponsePayload::Json(other) => Err(MockServerError::Unknown(format!(
            "expected a JSON array of {what}, got: {other}"
        ))),
        ResponsePayload::Text(text) => Err(MockServerError::Unknown(format!(
            "expected a JSON array of {what}, got non-JSON body: {text}"
        ))),
    }
}
