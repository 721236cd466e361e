//! HTTP client returning decoded JSON, with retry for transient failures.

/// Client facade with URL building, default headers, and retry.
pub mod client;
/// Failure classification.
pub mod error;
/// Single request/response exchange and its reqwest implementation.
pub mod transport;

pub use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
pub use reqwest::{Method, StatusCode};

pub use client::{HttpClient, HttpClientBuilder};
pub use error::FetchError;
pub use transport::{BasicAuth, HttpRequest, HttpResponse, ReqwestTransport, RequestBody, Transport};
