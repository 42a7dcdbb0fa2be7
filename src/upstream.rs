use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};
use std::error::Error as StdError;
use thiserror::Error;

/// One outbound call to the monitoring API.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

/// Fully buffered upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("failed to build upstream request: {0}")]
    Request(String),

    #[error("failed to reach upstream: {0}")]
    Unreachable(String),

    #[error("upstream connection timed out: {0}")]
    TimedOut(String),

    #[error("failed to read upstream response: {0}")]
    Body(String),
}

impl From<reqwest::Error> for ConnectorError {
    fn from(err: reqwest::Error) -> Self {
        // The url may carry tenant query parameters; keep it out of client-facing text
        let err = err.without_url();
        let message = error_chain(&err);
        if err.is_builder() {
            ConnectorError::Request(message)
        } else if err.is_timeout() {
            ConnectorError::TimedOut(message)
        } else if err.is_body() || err.is_decode() {
            ConnectorError::Body(message)
        } else {
            ConnectorError::Unreachable(message)
        }
    }
}

// reqwest's top-level message is generic ("error sending request"); the cause
// (dns, refused, tls) lives in the source chain.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[async_trait]
pub trait Upstream: Send + Sync {
    /// Performs a single request/response cycle. No retries, no internal timeout.
    async fn call(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ConnectorError>;
}

/// [`Upstream`] backed by a shared reqwest client.
pub struct HttpConnector {
    client: reqwest::Client,
}

impl HttpConnector {
    pub fn new() -> Result<Self, ConnectorError> {
        let client = reqwest::Client::builder()
            // relay redirects to the caller instead of following them
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Upstream for HttpConnector {
    async fn call(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ConnectorError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}
