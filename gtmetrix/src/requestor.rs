//! The single place where HTTP requests to the API are made.
//!
//! [`Requestor`] owns the credentials and the base URL, issues requests with
//! or without following redirects, validates the JSON envelope of every
//! response and retries requests rejected with one of the two known
//! rate-limit errors.

use crate::config::ClientConfig;
use crate::error::{ApiErrorObject, ApiErrorResponse, FailurePayload, GtmetrixError, GtmetrixResult};
use crate::shape;
use reqwest::blocking::{Client, Response};
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Too many tests pending; retry once existing tests have completed.
pub const TOO_MANY_PENDING_TESTS: &str = "E42900";
/// Rate limit exceeded; `X-RateLimit-Reset` holds the seconds left in the
/// current window.
pub const RATE_LIMIT_EXCEEDED: &str = "E42901";
pub const RATE_LIMIT_RESET_HEADER: &str = "X-RateLimit-Reset";
pub const DEFAULT_RATE_LIMIT_DELAY: u64 = 3;

/// Blocking delay used between retries and between completion polls.
///
/// The argument is a number of time units; [`ThreadSleep`] treats them as
/// seconds. Tests substitute a recording implementation.
pub trait Wait: Send + Sync {
    fn wait(&self, units: u64);
}

impl<F> Wait for F
where
    F: Fn(u64) + Send + Sync,
{
    fn wait(&self, units: u64) {
        self(units)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Wait for ThreadSleep {
    fn wait(&self, units: u64) {
        std::thread::sleep(Duration::from_secs(units));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl RequestBody {
    fn to_bytes(&self) -> GtmetrixResult<Vec<u8>> {
        match self {
            RequestBody::Json(value) => Ok(serde_json::to_vec(value)?),
            RequestBody::Text(text) => Ok(text.as_bytes().to_vec()),
            RequestBody::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub path: String,
    pub method: Option<Method>,
    pub body: Option<RequestBody>,
    pub headers: Vec<(String, String)>,
    pub follow_redirects: bool,
    pub retries: u32,
    pub decode_envelope: bool,
}

impl ApiRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: None,
            body: None,
            headers: Vec::new(),
            follow_redirects: false,
            retries: crate::config::DEFAULT_RETRIES,
            decode_envelope: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(path).with_method(Method::GET)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(path).with_method(Method::POST)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(path).with_method(Method::DELETE)
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn with_text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    pub fn with_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = Some(RequestBody::Bytes(body));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn following_redirects(mut self) -> Self {
        self.follow_redirects = true;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Leaves the response body unread; used for binary downloads and for
    /// operations without a response body.
    pub fn raw(mut self) -> Self {
        self.decode_envelope = false;
        self
    }

    fn effective_method(&self) -> Method {
        match &self.method {
            Some(method) => method.clone(),
            None if self.body.is_some() => Method::POST,
            None => Method::GET,
        }
    }
}

/// A classified response.
///
/// For decoded requests `document` holds the whole JSON envelope; for raw
/// requests the body is left unread and can be taken with
/// [`ApiResponse::into_body`].
#[derive(Debug)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    document: Option<Value>,
    body: Option<Response>,
}

impl ApiResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn document(&self) -> Option<&Value> {
        self.document.as_ref()
    }

    /// The `data` member of the envelope.
    pub fn data(&self) -> Option<&Value> {
        self.document.as_ref().and_then(|document| document.get("data"))
    }

    pub fn into_data(self) -> Option<Value> {
        match self.document {
            Some(Value::Object(mut object)) => object.remove("data"),
            _ => None,
        }
    }

    pub fn into_body(self) -> Option<Response> {
        self.body
    }
}

pub struct Requestor {
    base_url: String,
    api_key: String,
    client: Client,
    redirect_client: Client,
    retries: u32,
    wait: Arc<dyn Wait>,
}

impl fmt::Debug for Requestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requestor")
            .field("base_url", &self.base_url)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

impl Requestor {
    pub fn new(config: &ClientConfig) -> GtmetrixResult<Self> {
        Self::with_wait(config, Arc::new(ThreadSleep))
    }

    pub fn with_wait(config: &ClientConfig, wait: Arc<dyn Wait>) -> GtmetrixResult<Self> {
        config
            .validate()
            .map_err(|message| GtmetrixError::InvalidConfig { message })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()?;

        let redirect_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            base_url: config.normalized_base_url(),
            api_key: config.api_key.clone(),
            client,
            redirect_client,
            retries: config.retries,
            wait,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Rate-limit retry budget applied by entity operations.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn wait(&self, units: u64) {
        self.wait.wait(units);
    }

    /// Turns a link returned by the API into a path relative to the base URL.
    ///
    /// Relative paths are returned unchanged; absolute URLs outside of the
    /// base URL yield `None`.
    pub fn relative_path<'a>(&self, url: &'a str) -> Option<&'a str> {
        if let Some(path) = url.strip_prefix(self.base_url.as_str()) {
            Some(path)
        } else if url.contains("://") {
            None
        } else {
            Some(url)
        }
    }

    /// Issues `request`, retrying on the recognised rate-limit errors until
    /// the retry budget runs out.
    pub fn request(&self, request: &ApiRequest) -> GtmetrixResult<ApiResponse> {
        let body = request.body.as_ref().map(RequestBody::to_bytes).transpose()?;
        let mut remaining = request.retries;

        loop {
            let error = match self.send(request, body.as_deref()) {
                Err(GtmetrixError::Api(error)) => error,
                other => return other,
            };

            let Some(delay) = rate_limit_delay(&error) else {
                return Err(GtmetrixError::Api(error));
            };

            if remaining == 0 {
                warn!(
                    "Rate limit retries exhausted for {} ({})",
                    request.path, error
                );
                return Err(GtmetrixError::Api(error));
            }

            warn!(
                "Rate limited on {} ({}), retrying in {} ({} retries left)",
                request.path,
                error,
                delay,
                remaining - 1
            );
            self.wait.wait(delay);
            remaining -= 1;
        }
    }

    fn send(&self, request: &ApiRequest, body: Option<&[u8]>) -> GtmetrixResult<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let method = request.effective_method();
        let client = if request.follow_redirects {
            &self.redirect_client
        } else {
            &self.client
        };

        debug!("{} {}", method, url);

        let mut builder = client
            .request(method, &url)
            .basic_auth(&self.api_key, Some(""));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send()?;
        let status = response.status();
        let headers = response.headers().clone();

        debug!("Received HTTP {} for {}", status.as_u16(), url);

        if status.as_u16() >= 400 {
            let bytes = response.bytes()?;
            return Err(classify_error(status, headers, &bytes));
        }

        if !request.decode_envelope {
            return Ok(ApiResponse {
                status,
                headers,
                document: None,
                body: Some(response),
            });
        }

        let bytes = response.bytes()?;
        let document = decode_envelope(status, &bytes)?;

        Ok(ApiResponse {
            status,
            headers,
            document: Some(document),
            body: None,
        })
    }
}

/// Delay before retrying a rejected request, or `None` when the error is not
/// one of the recognised rate-limit conditions.
pub(crate) fn rate_limit_delay(error: &ApiErrorResponse) -> Option<u64> {
    let first = error.first()?;
    // Only the string "429" counts; a numeric status is not a rate limit.
    let textual_status = first.raw.get("status").is_some_and(Value::is_string);
    if !textual_status || first.status != "429" {
        return None;
    }

    match first.code.as_str() {
        TOO_MANY_PENDING_TESTS => Some(DEFAULT_RATE_LIMIT_DELAY),
        RATE_LIMIT_EXCEEDED => {
            let reset = error
                .header(RATE_LIMIT_RESET_HEADER)
                .and_then(|value| value.trim().parse::<i64>().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT_DELAY as i64);
            Some(reset.max(1) as u64)
        }
        _ => None,
    }
}

fn classify_error(status: StatusCode, headers: HeaderMap, bytes: &[u8]) -> GtmetrixError {
    if bytes.is_empty() {
        return GtmetrixError::error_failure(
            "API returned empty response",
            status,
            FailurePayload::Bytes(Vec::new()),
        );
    }

    let document: Value = match serde_json::from_slice(bytes) {
        Ok(document) => document,
        Err(_) => {
            return GtmetrixError::error_failure(
                "API returned unparsable JSON",
                status,
                FailurePayload::Bytes(bytes.to_vec()),
            )
        }
    };

    let errors = match document.get("errors") {
        None => {
            return GtmetrixError::error_failure(
                "API returned no errors with an HTTP code 400 or over",
                status,
                FailurePayload::Json(document),
            )
        }
        Some(Value::Array(errors)) => errors,
        Some(_) => {
            return GtmetrixError::error_failure(
                "API returned non-list of errors",
                status,
                FailurePayload::Json(document),
            )
        }
    };

    if errors.is_empty() {
        return GtmetrixError::error_failure(
            "API returned empty list of errors",
            status,
            FailurePayload::Json(document),
        );
    }

    if !errors.iter().all(shape::is_error) {
        return GtmetrixError::error_failure(
            "API returned non-error in error list",
            status,
            FailurePayload::Json(document),
        );
    }

    let errors = errors
        .iter()
        .filter_map(Value::as_object)
        .map(ApiErrorObject::from_object)
        .collect();

    GtmetrixError::Api(ApiErrorResponse {
        status,
        headers,
        errors,
        document,
    })
}

fn decode_envelope(status: StatusCode, bytes: &[u8]) -> GtmetrixResult<Value> {
    if bytes.is_empty() {
        return Err(GtmetrixError::failure(
            "API returned empty response",
            Some(status),
            FailurePayload::Bytes(Vec::new()),
        ));
    }

    let document: Value = serde_json::from_slice(bytes).map_err(|_| {
        GtmetrixError::failure(
            "API returned unparsable JSON",
            Some(status),
            FailurePayload::Bytes(bytes.to_vec()),
        )
    })?;

    if document.get("errors").is_some() {
        return Err(GtmetrixError::failure(
            format!(
                "API returned errors with an HTTP code {} under 400",
                status.as_u16()
            ),
            Some(status),
            FailurePayload::Json(document),
        ));
    }

    if document.get("data").is_none() {
        return Err(GtmetrixError::failure(
            "API returned no data",
            Some(status),
            FailurePayload::Json(document),
        ));
    }

    Ok(document)
}
