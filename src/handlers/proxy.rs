use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};
use crate::error::ProxyError;
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::ProxyRequest;
use crate::state::AppState;

// Catch-all: everything under the mount point goes through the proxy core
pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let request = ProxyRequest::new(method, &uri, &headers, body);
    let budget = state.proxy.config().request_timeout;
    let result = match tokio::time::timeout(budget, state.proxy.handle(request)).await {
        Ok(result) => result,
        Err(_) => Err(ProxyError::Timeout(budget)),
    };

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());

    match result {
        Ok(response) => response.into_response(),
        Err(ProxyError::Unauthorized) => {
            warn!(path = %uri.path(), "rejected request without API key");
            ProxyError::Unauthorized.into_response()
        }
        Err(e) => {
            error!(error = %e, path = %uri.path(), "proxy request failed");
            e.into_response()
        }
    }
}
