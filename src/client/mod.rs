//! Client for the Hyperping REST API.
//!
//! [`HyperpingClient`] owns authentication, retries and error decoding.
//! Entity endpoints live in one file per API area and are plain async
//! methods on the client.
//!
//! # Retries
//!
//! Transport failures and responses with status 429, 500, 502, 503 or 504
//! are retried up to `max_retries` times. The wait is `min * 2^attempt`,
//! capped at `max`; a positive `Retry-After` on a 429 replaces it.
//!
//! A [`CircuitBreaker`] shared by all clones wraps each call, retries
//! included, and fails fast while the API keeps erroring.

use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use regex::Regex;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

mod breaker;
mod error;
mod healthchecks;
mod incidents;
mod maintenance;
mod models;
mod monitors;
mod outages;
mod reports;
mod statuspages;
mod transport;

pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use error::{sanitize_message, ApiError, ClientError, ValidationDetail};
pub use healthchecks::*;
pub use incidents::*;
pub use maintenance::*;
pub use models::*;
pub use monitors::*;
pub use outages::*;
pub use reports::*;
pub use statuspages::*;
#[cfg(test)]
pub use transport::MockHttpTransport;
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, DEFAULT_TIMEOUT,
    MAX_RESPONSE_BODY_BYTES,
};

pub const DEFAULT_BASE_URL: &str = "https://api.hyperping.io";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_WAIT_MIN: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRY_WAIT_MAX: Duration = Duration::from_secs(30);

const MAX_RESOURCE_ID_LENGTH: usize = 128;
const MAX_USER_AGENT_LENGTH: usize = 256;
const MAX_BACKOFF_EXPONENT: u32 = 10;
const RETRYABLE_STATUS_CODES: &[u16] = &[429, 500, 502, 503, 504];

static RESOURCE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_-]*$").expect("resource id pattern"));

/// Check that an id is safe to splice into a URL path.
///
/// Rejects path traversal, query/fragment/authority metacharacters and
/// anything outside `[a-zA-Z0-9_-]`.
pub fn validate_resource_id(id: &str) -> Result<(), ClientError> {
    if id.is_empty() {
        return Err(ClientError::InvalidId(
            "resource ID must not be empty".to_string(),
        ));
    }
    if id.len() > MAX_RESOURCE_ID_LENGTH {
        return Err(ClientError::InvalidId(format!(
            "invalid resource ID: length {} exceeds maximum of {}",
            id.len(),
            MAX_RESOURCE_ID_LENGTH
        )));
    }
    if id.contains("..") || id.contains('/') {
        return Err(ClientError::InvalidId(format!(
            "invalid resource ID {:?}: path traversal not allowed",
            id
        )));
    }
    if id.contains(['?', '#', '@', '&', '=']) {
        return Err(ClientError::InvalidId(format!(
            "invalid resource ID {:?}: URL metacharacters not allowed",
            id
        )));
    }
    if !RESOURCE_ID.is_match(id) {
        return Err(ClientError::InvalidId(format!(
            "invalid resource ID {:?}: must match [a-zA-Z0-9_-]",
            id
        )));
    }
    Ok(())
}

/// Build the `User-Agent` header value.
///
/// `append` is the raw `TF_APPEND_USER_AGENT` value; control characters are
/// dropped before it is added.
pub fn build_user_agent(version: &str, append: Option<&str>) -> String {
    let mut user_agent = format!(
        "terraform-provider-hyperping/{} (rust; {}/{})",
        version,
        std::env::consts::OS,
        std::env::consts::ARCH
    );

    if let Some(extra) = append.map(sanitize_user_agent).filter(|s| !s.is_empty()) {
        user_agent.push(' ');
        user_agent.push_str(&extra);
    }

    if user_agent.len() > MAX_USER_AGENT_LENGTH {
        let mut cut = MAX_USER_AGENT_LENGTH;
        while !user_agent.is_char_boundary(cut) {
            cut -= 1;
        }
        user_agent.truncate(cut);
    }
    user_agent
}

fn sanitize_user_agent(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c >= '\u{20}' && *c != '\u{7f}')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Seconds to wait from a `Retry-After` header: delta-seconds or an HTTP
/// date. Missing, invalid or past values give 0.
pub fn parse_retry_after(value: &str) -> u64 {
    let value = value.trim();
    if value.is_empty() {
        return 0;
    }
    if let Ok(seconds) = value.parse::<i64>() {
        return seconds.max(0) as u64;
    }
    match chrono::DateTime::parse_from_rfc2822(value) {
        Ok(when) => {
            let delta = when.with_timezone(&chrono::Utc) - chrono::Utc::now();
            delta.num_seconds().max(0) as u64
        }
        Err(_) => 0,
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<ValidationDetail>,
}

fn parse_error_response(response: &HttpResponse) -> ApiError {
    let reason = reqwest::StatusCode::from_u16(response.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or_default();
    let mut err = ApiError::new(response.status, reason);

    if response.status == 429 {
        err.retry_after = response
            .retry_after
            .as_deref()
            .map(parse_retry_after)
            .unwrap_or(0);
    }

    if let Ok(body) = serde_json::from_slice::<ErrorBody>(&response.body) {
        if !body.error.is_empty() {
            err.message = body.error.clone();
        }
        if !body.message.is_empty() && body.message != body.error {
            err.message = body.message;
        }
        err.details = body.details;
    }
    err
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>, ClientError> {
    serde_json::to_vec(body).map_err(|e| ClientError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
    let body = if body.is_empty() { b"null".as_slice() } else { body };
    serde_json::from_slice(body).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Decode a list that may come back bare or wrapped in an object under one
/// of `keys`. The first non-empty wrapped list wins.
pub(crate) fn decode_list<T: DeserializeOwned>(
    body: &[u8],
    keys: &[&str],
) -> Result<Vec<T>, ClientError> {
    let raw: Value = decode(body)?;
    match raw {
        Value::Array(_) => {
            serde_json::from_value(raw).map_err(|e| ClientError::Decode(e.to_string()))
        }
        Value::Object(mut map) => {
            for key in keys {
                if let Some(Value::Array(items)) = map.remove(*key) {
                    if !items.is_empty() {
                        return serde_json::from_value(Value::Array(items))
                            .map_err(|e| ClientError::Decode(e.to_string()));
                    }
                }
            }
            Ok(Vec::new())
        }
        Value::Null => Ok(Vec::new()),
        other => Err(ClientError::Decode(format!(
            "expected list response, got {}",
            other
        ))),
    }
}

/// Append `params` to `path` as a form-encoded query string.
pub(crate) fn with_query(path: String, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return path;
    }
    let query = reqwest::Url::parse_with_params("http://query.invalid/", params)
        .ok()
        .and_then(|u| u.query().map(str::to_string))
        .unwrap_or_default();
    format!("{}?{}", path, query)
}

/// Hyperping API client.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct HyperpingClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    api_key: String,
    max_retries: u32,
    retry_wait_min: Duration,
    retry_wait_max: Duration,
    user_agent: String,
    breaker: Arc<CircuitBreaker>,
}

impl fmt::Debug for HyperpingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperpingClient")
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl HyperpingClient {
    pub fn new(api_key: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_wait_min: DEFAULT_RETRY_WAIT_MIN,
            retry_wait_max: DEFAULT_RETRY_WAIT_MAX,
            user_agent: build_user_agent("dev", None),
            breaker: Arc::new(CircuitBreaker::default()),
        }
    }

    /// Override the API root. A trailing `/` is dropped.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_wait(mut self, min: Duration, max: Duration) -> Self {
        self.retry_wait_min = min;
        self.retry_wait_max = max;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker = Arc::new(CircuitBreaker::new(config));
        self
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn backoff(&self, attempt: u32, retry_after: u64) -> Duration {
        if retry_after > 0 {
            return Duration::from_secs(retry_after).min(self.retry_wait_max);
        }
        let factor = 1u32 << attempt.min(MAX_BACKOFF_EXPONENT);
        self.retry_wait_min
            .saturating_mul(factor)
            .min(self.retry_wait_max)
    }

    fn build_request(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> HttpRequest {
        HttpRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            headers: vec![
                ("Authorization".to_string(), format!("Bearer {}", self.api_key)),
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "application/json".to_string()),
                ("User-Agent".to_string(), self.user_agent.clone()),
            ],
            body,
        }
    }

    /// Send a request through the circuit breaker and return the raw
    /// success body.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, ClientError> {
        self.breaker.before_request()?;
        let result = self.execute_with_retry(method, path, body).await;
        match &result {
            Err(err) if breaker::counts_as_failure(err) => self.breaker.record_failure(),
            _ => self.breaker.record_success(),
        }
        result
    }

    async fn execute_with_retry(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, ClientError> {
        let mut attempt = 0;
        loop {
            debug!(method = %method, path, attempt = attempt + 1, "sending API request");
            let request = self.build_request(method.clone(), path, body.clone());
            let started = Instant::now();
            let result = self.transport.send(request).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            let response = match result {
                Ok(response) => response,
                Err(ClientError::Request(msg)) => {
                    debug!(
                        method = %method,
                        path,
                        attempt = attempt + 1,
                        duration_ms,
                        error = %sanitize_message(&msg),
                        "request failed"
                    );
                    if attempt >= self.max_retries {
                        return Err(ClientError::Request(msg));
                    }
                    tokio::time::sleep(self.backoff(attempt, 0)).await;
                    attempt += 1;
                    continue;
                },
                Err(other) => return Err(other),
            };

            debug!(
                method = %method,
                path,
                status_code = response.status,
                attempt = attempt + 1,
                duration_ms,
                "received API response"
            );

            if response.is_success() {
                return Ok(response.body);
            }

            let err = parse_error_response(&response);
            if !RETRYABLE_STATUS_CODES.contains(&response.status) || attempt >= self.max_retries {
                return Err(ClientError::Api(err));
            }

            debug!(
                method = %method,
                path,
                status_code = response.status,
                attempt = attempt + 1,
                max_retries = self.max_retries,
                "retrying request"
            );
            tokio::time::sleep(self.backoff(attempt, err.retry_after)).await;
            attempt += 1;
        }
    }

    pub(crate) async fn get_raw(&self, path: &str) -> Result<Vec<u8>, ClientError> {
        self.execute(Method::GET, path, None).await
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        decode(&self.get_raw(path).await?)
    }

    pub(crate) async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = self.execute(Method::POST, path, Some(encode(body)?)).await?;
        decode(&bytes)
    }

    /// POST without a body, for action endpoints like `/pause`.
    pub(crate) async fn post_action<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ClientError> {
        decode(&self.execute(Method::POST, path, None).await?)
    }

    pub(crate) async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = self.execute(Method::PUT, path, Some(encode(body)?)).await?;
        decode(&bytes)
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.execute(Method::DELETE, path, None).await.map(|_| ())
    }
}

/// Envelope returned by action endpoints (`/pause`, `/acknowledge`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub uuid: String,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A client over `mock` with millisecond retry waits.
    pub fn client(mock: MockHttpTransport) -> HyperpingClient {
        HyperpingClient::new("sk_test_key", Arc::new(mock))
            .with_base_url("https://api.hyperping.io")
            .with_retry_wait(Duration::from_millis(1), Duration::from_millis(5))
    }

    pub fn ok(body: Value) -> Result<HttpResponse, ClientError> {
        Ok(HttpResponse::json(200, &body))
    }

    pub fn status(code: u16, body: Value) -> Result<HttpResponse, ClientError> {
        Ok(HttpResponse::json(code, &body))
    }

    pub fn path_of(req: &HttpRequest) -> &str {
        req.url
            .strip_prefix("https://api.hyperping.io")
            .unwrap_or(&req.url)
    }
}
