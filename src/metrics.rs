use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("proxy_requests_total", "Total requests through the proxy").unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("proxy_cache_hits_total", "Reads answered from the response cache").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("proxy_cache_misses_total", "Cacheable reads forwarded to upstream").unwrap();
    pub static ref UPSTREAM_ERRORS: Counter = register_counter!(
        "proxy_upstream_errors_total",
        "Upstream calls that failed before a response arrived"
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "proxy_request_latency_seconds",
        "Time to answer a proxied request, cache hits included"
    )
    .unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("proxy_cache_size", "Cache entries currently stored").unwrap();
}
