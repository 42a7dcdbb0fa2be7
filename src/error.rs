use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use crate::upstream::ConnectorError;

const PROXY_ERROR: &str = "Proxy Error";
const PROXY_ERROR_DETAILS: &str = "Check the proxy logs for more information";

/// Failures of the proxy itself. Upstream responses with non-200 status are
/// relayed as-is and never become a `ProxyError`.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Upstream(#[from] ConnectorError),

    #[error("request body is not valid text: {0}")]
    MalformedRequestBody(#[from] std::str::Utf8Error),

    #[error("upstream did not respond within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("API Key is required")]
    Unauthorized,
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Unauthorized => StatusCode::UNAUTHORIZED,
            ProxyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Upstream(_) | ProxyError::MalformedRequestBody(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<&'static str>,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = match &self {
            ProxyError::Unauthorized => ErrorBody {
                error: "Unauthorized",
                message: self.to_string(),
                details: None,
            },
            _ => ErrorBody {
                error: PROXY_ERROR,
                message: self.to_string(),
                details: Some(PROXY_ERROR_DETAILS),
            },
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn connector_failure_is_bad_gateway_envelope() {
        let err = ProxyError::from(ConnectorError::Unreachable("connection refused".to_string()));
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Proxy Error");
        assert!(body["message"].as_str().unwrap().contains("connection refused"));
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn timeout_is_gateway_timeout() {
        let response = ProxyError::Timeout(Duration::from_secs(30)).into_response();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Proxy Error");
        assert_eq!(body["message"], "upstream did not respond within 30s");
    }

    #[tokio::test]
    async fn unauthorized_envelope() {
        let response = ProxyError::Unauthorized.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Unauthorized");
        assert_eq!(body["message"], "API Key is required");
        assert!(body.get("details").is_none());
    }
}
