//! JSON client with base-URL joining, session headers, and retrying GETs.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::FetchError;
use crate::transport::{BasicAuth, HttpRequest, ReqwestTransport, RequestBody, Transport};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// HTTP client that returns decoded JSON.
///
/// GET requests are retried on timeouts and connection failures, waiting
/// `backoff_base * 2^(retry - 1)` before each retry. Error statuses and
/// undecodable bodies fail immediately. POST requests are sent once.
pub struct HttpClient {
    base_url: Option<String>,
    timeout: Duration,
    max_retries: u32,
    backoff_base: Duration,
    default_headers: HeaderMap,
    basic_auth: Option<BasicAuth>,
    transport: Box<dyn Transport>,
}

/// Builder for [`HttpClient`].
pub struct HttpClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    max_retries: u32,
    backoff_base: Duration,
    user_agent: Option<String>,
    transport: Option<Box<dyn Transport>>,
}

impl HttpClient {
    /// Start configuring a client.
    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Base URL relative paths are joined onto.
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Retries after the first failed GET attempt.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before the first retry.
    #[must_use]
    pub fn backoff_base(&self) -> Duration {
        self.backoff_base
    }

    /// Resolve `path` against the base URL with exactly one `/` between them.
    ///
    /// Absolute URLs and paths on a client without base URL are returned unchanged.
    #[must_use]
    pub fn build_url(&self, path: &str) -> String {
        match &self.base_url {
            Some(base) if !is_absolute(path) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            _ => path.to_owned(),
        }
    }

    /// Wait before retry number `retry` (starting at 1).
    #[must_use]
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 2_u32.saturating_pow(retry.saturating_sub(1));
        self.backoff_base.saturating_mul(factor)
    }

    /// Add or replace a header sent with every request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidHeader`] if the name or value is not valid in HTTP.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), FetchError> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .ok()
            .ok_or_else(|| invalid_header(name))?;
        let header_value = HeaderValue::from_str(value)
            .ok()
            .ok_or_else(|| invalid_header(name))?;

        self.default_headers.insert(header_name, header_value);
        info!(header = name, "Set header");
        Ok(())
    }

    /// Use basic authentication for every request.
    pub fn set_basic_auth(&mut self, username: &str, password: Option<&str>) {
        self.basic_auth = Some(BasicAuth {
            username: username.to_owned(),
            password: password.map(str::to_owned),
        });
        info!("Authentication configured");
    }

    /// Send `Authorization: Bearer <token>` with every request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidHeader`] if the token contains characters not
    /// allowed in a header.
    pub fn set_bearer_token(&mut self, token: &str) -> Result<(), FetchError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .ok()
            .ok_or_else(|| invalid_header(AUTHORIZATION.as_str()))?;
        value.set_sensitive(true);

        self.default_headers.insert(AUTHORIZATION, value);
        info!("Bearer token configured");
        Ok(())
    }

    /// GET `path` and decode the JSON body, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns the last [`FetchError`] once retries are exhausted, or the first
    /// non-transient one.
    pub async fn try_get(
        &self,
        path: &str,
        params: &[(&str, &str)],
        headers: Option<&HeaderMap>,
    ) -> Result<Value, FetchError> {
        let request = self.request(Method::GET, path, params, headers, RequestBody::Empty);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            info!(url = %request.url, attempt, "GET request");

            match self.exchange(request.clone()).await {
                Ok(data) => {
                    info!(url = %request.url, attempt, "GET successful");
                    return Ok(data);
                }
                Err(err) if err.is_transient() && attempt <= self.max_retries => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        url = %request.url,
                        attempt,
                        error = %err,
                        ?delay,
                        "GET failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    error!(url = %request.url, attempt, error = %err, "GET failed");
                    return Err(err);
                }
            }
        }
    }

    /// GET `path`, returning `None` on any failure. The failure is logged.
    pub async fn get(
        &self,
        path: &str,
        params: &[(&str, &str)],
        headers: Option<&HeaderMap>,
    ) -> Option<Value> {
        self.try_get(path, params, headers).await.ok()
    }

    /// POST to `path` once and decode the JSON body.
    ///
    /// Form fields take precedence over a JSON body when both are given.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] on any failure; nothing is retried.
    pub async fn try_post(
        &self,
        path: &str,
        form: Option<&[(&str, &str)]>,
        json: Option<&Value>,
        headers: Option<&HeaderMap>,
    ) -> Result<Value, FetchError> {
        let body = match (form, json) {
            (Some(fields), _) => RequestBody::Form(owned_pairs(fields)),
            (None, Some(document)) => RequestBody::Json(document.clone()),
            (None, None) => RequestBody::Empty,
        };
        let request = self.request(Method::POST, path, &[], headers, body);
        let url = request.url.clone();
        info!(url = %url, "POST request");

        match self.exchange(request).await {
            Ok(data) => {
                info!(url = %url, "POST successful");
                Ok(data)
            }
            Err(err) => {
                error!(url = %url, error = %err, "POST failed");
                Err(err)
            }
        }
    }

    /// POST to `path`, returning `None` on any failure. The failure is logged.
    pub async fn post(
        &self,
        path: &str,
        form: Option<&[(&str, &str)]>,
        json: Option<&Value>,
        headers: Option<&HeaderMap>,
    ) -> Option<Value> {
        self.try_post(path, form, json, headers).await.ok()
    }

    /// Drop the client and its connection pool.
    pub fn close(self) {
        info!(base_url = ?self.base_url, "HTTP client closed");
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        headers: Option<&HeaderMap>,
        body: RequestBody,
    ) -> HttpRequest {
        let mut merged = self.default_headers.clone();
        if let Some(extra) = headers {
            for (name, value) in extra {
                merged.insert(name.clone(), value.clone());
            }
        }

        HttpRequest {
            method,
            url: self.build_url(path),
            query: owned_pairs(params),
            headers: merged,
            basic_auth: self.basic_auth.clone(),
            body,
            timeout: self.timeout,
        }
    }

    async fn exchange(&self, request: HttpRequest) -> Result<Value, FetchError> {
        let url = request.url.clone();
        let response = self.transport.execute(request).await?;

        if !response.status.is_success() {
            return Err(FetchError::Status {
                url,
                status: response.status,
            });
        }

        serde_json::from_slice(&response.body).map_err(|source| FetchError::Decode { url, source })
    }
}

impl HttpClientBuilder {
    /// Join relative request paths onto `base_url`.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Per-request timeout, 10 seconds by default.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retries after the first failed GET attempt, 3 by default.
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay before the first retry, doubled for each further one. 1 second by default.
    #[must_use]
    pub fn backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// `User-Agent` for the default reqwest transport.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Replace the reqwest transport.
    #[must_use]
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Setup`] if the reqwest client cannot be created.
    pub fn build(self) -> Result<HttpClient, FetchError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let mut builder = Client::builder();
                if let Some(user_agent) = self.user_agent {
                    builder = builder.user_agent(user_agent);
                }
                let client = builder.build().map_err(FetchError::Setup)?;
                Box::new(ReqwestTransport::new(client))
            }
        };

        info!(
            base_url = ?self.base_url,
            timeout = ?self.timeout,
            max_retries = self.max_retries,
            "HTTP client initialized"
        );

        Ok(HttpClient {
            base_url: self.base_url,
            timeout: self.timeout,
            max_retries: self.max_retries,
            backoff_base: self.backoff_base,
            default_headers: HeaderMap::new(),
            basic_auth: None,
            transport,
        })
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            user_agent: None,
            transport: None,
        }
    }
}

/// Whether `path` is a full URL with a host rather than a path on the base URL.
fn is_absolute(path: &str) -> bool {
    Url::parse(path).is_ok_and(|url| url.has_host())
}

fn owned_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|&(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

fn invalid_header(name: &str) -> FetchError {
    FetchError::InvalidHeader {
        name: name.to_owned(),
    }
}
