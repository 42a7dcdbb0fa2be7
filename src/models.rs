use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use crate::cache::CacheHit;

pub const API_KEY: HeaderName = HeaderName::from_static("apikey");
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
pub const X_CACHE_AGE: HeaderName = HeaderName::from_static("x-cache-age");

// Inbound request reduced to what the proxy core looks at
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<HeaderValue>,
    pub api_key: Option<HeaderValue>,
    pub authorization: Option<HeaderValue>,
    pub body: Bytes,
}

impl ProxyRequest {
    pub fn new(method: Method, uri: &Uri, headers: &HeaderMap, body: Bytes) -> Self {
        // `apiKey` and `apikey` are the same header once names are normalized
        let api_key = headers
            .get_all(&API_KEY)
            .iter()
            .find(|value| !value.is_empty())
            .cloned();

        Self {
            method,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            content_type: headers.get(header::CONTENT_TYPE).cloned(),
            api_key,
            authorization: headers
                .get(header::AUTHORIZATION)
                .filter(|value| !value.is_empty())
                .cloned(),
            body,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() || self.authorization.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit { age_secs: u64 },
    Miss,
}

impl CacheStatus {
    /// Value of the `X-Cache` header.
    pub fn label(&self) -> &'static str {
        match self {
            CacheStatus::Hit { .. } => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

// Response relayed to the client (CORS is added by the middleware)
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub cache: CacheStatus,
}

impl From<CacheHit> for ProxyResponse {
    fn from(hit: CacheHit) -> Self {
        Self {
            status: StatusCode::OK,
            headers: hit.entry.headers.clone(),
            body: hit.entry.body.clone(),
            cache: CacheStatus::Hit {
                age_secs: hit.age_secs(),
            },
        }
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;

        let headers = response.headers_mut();
        headers.insert(X_CACHE, HeaderValue::from_static(self.cache.label()));
        if let CacheStatus::Hit { age_secs } = self.cache {
            headers.insert(X_CACHE_AGE, HeaderValue::from(age_secs));
        }
        response
    }
}
