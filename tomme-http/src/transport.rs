//! One HTTP exchange, abstracted so the client logic can run without a network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;

use crate::error::FetchError;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Credentials for HTTP basic authentication.
pub struct BasicAuth {
    /// User name.
    pub username: String,
    /// Optional password.
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
/// Request payload.
pub enum RequestBody {
    /// No body.
    Empty,
    /// `application/x-www-form-urlencoded` fields.
    Form(Vec<(String, String)>),
    /// JSON document.
    Json(Value),
}

#[derive(Debug, Clone)]
/// Fully resolved request handed to a [`Transport`].
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL without query string.
    pub url: String,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// Headers after merging defaults and per-request overrides.
    pub headers: HeaderMap,
    /// Basic authentication, if configured.
    pub basic_auth: Option<BasicAuth>,
    /// Payload.
    pub body: RequestBody,
    /// Deadline for the whole exchange.
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
/// Raw answer from the server.
pub struct HttpResponse {
    /// Status code.
    pub status: StatusCode,
    /// Undecoded body.
    pub body: Vec<u8>,
}

#[async_trait]
/// Performs a single request without retrying or interpreting the status.
pub trait Transport: Send + Sync {
    /// Send `request` and collect the response body.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when no response could be received.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, FetchError>;
}

#[derive(Debug, Clone, Default)]
/// [`Transport`] backed by a pooled [`reqwest::Client`].
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Wrap an existing client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        let HttpRequest {
            method,
            url,
            query,
            headers,
            basic_auth,
            body,
            timeout,
        } = request;

        let mut req = self
            .client
            .request(method, &url)
            .timeout(timeout)
            .headers(headers);

        if !query.is_empty() {
            req = req.query(&query);
        }
        if let Some(auth) = basic_auth {
            req = req.basic_auth(auth.username, auth.password);
        }
        req = match body {
            RequestBody::Empty => req,
            RequestBody::Form(fields) => req.form(&fields),
            RequestBody::Json(document) => req.json(&document),
        };

        let response = req
            .send()
            .await
            .map_err(|err| FetchError::from_reqwest(&url, &err))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| FetchError::from_reqwest(&url, &err))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
