mod cache;
mod config;
mod cors;
mod error;
mod handlers;
mod metrics;
mod models;
mod proxy;
mod router;
mod state;
mod upstream;

#[cfg(test)]
mod test_support;

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use crate::cache::CacheStore;
use crate::config::{Args, LogFormat, ProxyConfig};
use crate::proxy::ProxyService;
use crate::router::build_router;
use crate::state::AppState;
use crate::upstream::HttpConnector;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.log_format);

    let config = ProxyConfig::from(&args);

    let connector = HttpConnector::new().unwrap_or_else(|e| {
        error!(error = %e, "failed to build upstream client");
        std::process::exit(1);
    });
    let cache = CacheStore::new(config.cache_ttl, config.sweep_threshold);

    info!(upstream = %config.upstream_url, mount_prefix = %config.mount_prefix, "forwarding requests");
    info!(
        enabled = config.cache_enabled,
        ttl_secs = config.cache_ttl.as_secs(),
        sweep_threshold = config.sweep_threshold,
        "response cache"
    );
    info!(
        request_timeout_secs = config.request_timeout.as_secs(),
        require_api_key = config.require_api_key,
        "request policy"
    );

    let state = Arc::new(AppState {
        proxy: ProxyService::new(config, cache, Arc::new(connector)),
    });
    let app = build_router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap_or_else(|e| {
        error!(error = %e, addr = %addr, "failed to bind listener");
        std::process::exit(1);
    });

    info!("Proxy running on http://{}", addr);
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().with_env_filter(filter).init(),
        LogFormat::Pretty => tracing_subscriber::fmt().pretty().with_env_filter(filter).init(),
    }
}
