use clap::{Parser, ValueEnum};
use std::time::Duration;

pub const DEFAULT_UPSTREAM_URL: &str = "https://itview.intwo.cloud/api";

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "opmanager-cache-proxy")]
#[command(about = "Caching reverse proxy for the OpManager monitoring API")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    // Upstream monitoring API base url
    #[arg(short, long, env = "API_BASE_URL", default_value = DEFAULT_UPSTREAM_URL)]
    pub upstream_url: String,

    // Path prefix stripped from inbound requests before forwarding
    #[arg(long, env = "PROXY_MOUNT_PREFIX", default_value = "/api")]
    pub mount_prefix: String,

    // Cache TTL in seconds
    #[arg(short, long, env = "CACHE_TTL_SECS", default_value_t = 300)]
    pub cache_ttl: u64,

    // Store size above which expired entries are swept
    #[arg(long, env = "CACHE_SWEEP_THRESHOLD", default_value_t = 100)]
    pub sweep_threshold: usize,

    // Wall-clock budget for a single proxied request, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout: u64,

    // Forward every request without caching
    #[arg(long, env = "PROXY_NO_CACHE")]
    pub no_cache: bool,

    // Reject requests without apiKey / Authorization with 401
    #[arg(long, env = "PROXY_REQUIRE_API_KEY")]
    pub require_api_key: bool,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

/// Runtime settings of the proxy core, decoupled from how they were parsed.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Base url of the upstream API, without a trailing slash.
    pub upstream_url: String,
    pub mount_prefix: String,
    pub cache_ttl: Duration,
    pub sweep_threshold: usize,
    pub request_timeout: Duration,
    pub cache_enabled: bool,
    pub require_api_key: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            mount_prefix: "/api".to_string(),
            cache_ttl: Duration::from_secs(5 * 60),
            sweep_threshold: 100,
            request_timeout: Duration::from_secs(30),
            cache_enabled: true,
            require_api_key: false,
        }
    }
}

impl From<&Args> for ProxyConfig {
    fn from(args: &Args) -> Self {
        Self {
            upstream_url: args.upstream_url.trim_end_matches('/').to_string(),
            mount_prefix: args.mount_prefix.clone(),
            cache_ttl: Duration::from_secs(args.cache_ttl),
            sweep_threshold: args.sweep_threshold,
            request_timeout: Duration::from_secs(args.request_timeout),
            cache_enabled: !args.no_cache,
            require_api_key: args.require_api_key,
        }
    }
}
