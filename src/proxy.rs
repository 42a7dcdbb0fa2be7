use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use std::sync::Arc;
use tracing::{debug, info};
use crate::cache::{CacheStore, make_cache_key};
use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::metrics::{CACHE_HITS, CACHE_MISSES, UPSTREAM_ERRORS};
use crate::models::{API_KEY, CacheStatus, ProxyRequest, ProxyResponse};
use crate::upstream::{Upstream, UpstreamRequest};

pub const PROXY_USER_AGENT: &str = "OpManager-Dashboard/1.0 (Caching Proxy)";

// Hop-by-hop headers describe the upstream connection, not the payload
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "content-length",
    "te",
    "trailer",
    "upgrade",
];

/// Cache-or-forward core of the proxy.
pub struct ProxyService {
    config: ProxyConfig,
    cache: CacheStore,
    upstream: Arc<dyn Upstream>,
}

impl ProxyService {
    pub fn new(config: ProxyConfig, cache: CacheStore, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            config,
            cache,
            upstream,
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    #[cfg(test)]
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Upstream url for an inbound path and raw query string.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> String {
        let suffix = path
            .strip_prefix(self.config.mount_prefix.as_str())
            .unwrap_or(path);
        let mut url = format!("{}{}", self.config.upstream_url, suffix);
        if let Some(query) = query {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    pub async fn handle(&self, request: ProxyRequest) -> Result<ProxyResponse, ProxyError> {
        if self.config.require_api_key && !request.has_credentials() {
            return Err(ProxyError::Unauthorized);
        }

        let target_url = self.target_url(&request.path, request.query.as_deref());
        let cache_key = if self.config.cache_enabled {
            make_cache_key(
                &request.method,
                &target_url,
                request.api_key.as_ref().map(HeaderValue::as_bytes),
            )
        } else {
            None
        };

        if let Some(key) = &cache_key {
            if let Some(hit) = self.cache.lookup(key) {
                CACHE_HITS.inc();
                debug!(key = %hit.entry.key, age_secs = hit.age_secs(), "cache HIT");
                let response = ProxyResponse::from(hit);
                info!(method = %request.method, target = %target_url, cache = response.cache.label(), "proxying request");
                return Ok(response);
            }
            CACHE_MISSES.inc();
        }

        info!(method = %request.method, target = %target_url, cache = CacheStatus::Miss.label(), "proxying request");

        let upstream_request = UpstreamRequest {
            method: request.method.clone(),
            headers: outbound_headers(&request),
            body: outbound_body(&request)?,
            url: target_url,
        };
        let response = self.upstream.call(upstream_request).await.inspect_err(|_| {
            UPSTREAM_ERRORS.inc();
        })?;

        let headers = relayable_headers(&response.headers);
        if response.status == StatusCode::OK {
            if let Some(key) = cache_key {
                self.cache
                    .insert(key, response.body.clone(), headers.clone());
            }
        } else {
            debug!(status = response.status.as_u16(), path = %request.path, "relaying upstream status");
        }

        Ok(ProxyResponse {
            status: response.status,
            headers,
            body: response.body,
            cache: CacheStatus::Miss,
        })
    }
}

// Only content type, credentials and our own user agent reach upstream
fn outbound_headers(request: &ProxyRequest) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        request
            .content_type
            .clone()
            .unwrap_or_else(|| HeaderValue::from_static("application/json")),
    );
    headers.insert(header::USER_AGENT, HeaderValue::from_static(PROXY_USER_AGENT));
    if let Some(api_key) = &request.api_key {
        headers.insert(API_KEY, api_key.clone());
    }
    if let Some(authorization) = &request.authorization {
        headers.insert(header::AUTHORIZATION, authorization.clone());
    }
    headers
}

fn outbound_body(request: &ProxyRequest) -> Result<Option<String>, ProxyError> {
    if request.method == Method::GET || request.method == Method::HEAD || request.body.is_empty() {
        return Ok(None);
    }
    let text = std::str::from_utf8(&request.body)?;
    Ok(Some(text.to_string()))
}

fn is_relayable(name: &HeaderName) -> bool {
    // names are always lowercase here
    let name = name.as_str();
    !name.starts_with("access-control-") && !HOP_BY_HOP.contains(&name)
}

/// Upstream headers minus CORS and hop-by-hop ones, first value per name.
pub fn relayable_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut relayed = HeaderMap::new();
    for name in upstream.keys().filter(|name| is_relayable(name)) {
        if let Some(value) = upstream.get(name) {
            relayed.insert(name.clone(), value.clone());
        }
    }
    relayed
}
