//! Image delivery server.
//!
//! This binary starts the HTTP server and wires the cache, sweeper and
//! image pipeline together.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_delivery::{
    cache::CacheStore,
    config::Config,
    server::{create_router, RouterConfig},
    transform::{ImagePipeline, LocalImageSource},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Image delivery v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Root: {}", config.root.display());
    info!(
        "  Cache: {} entries, {}s TTL, sweep every {}s",
        config.cache_max_entries, config.cache_ttl, config.sweep_interval
    );
    info!("  Default quality: {}", config.default_quality);

    let cache = Arc::new(CacheStore::new(config.cache_ttl(), config.cache_max_entries));
    let sweeper = cache.spawn_sweeper(config.sweep_interval());

    let source = LocalImageSource::new(config.root.clone());
    let pipeline = ImagePipeline::new(source, Arc::clone(&cache));

    let shutdown = CancellationToken::new();
    let router = create_router(pipeline, build_router_config(&config, shutdown.clone()));

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);
    info!(
        "  curl 'http://{}/optimized-image?path=/static/<file>&w=320'",
        addr
    );

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await;

    sweeper.stop().await;

    if let Err(e) = result {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "image_delivery=debug,tower_http=debug"
    } else {
        "image_delivery=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config, shutdown: CancellationToken) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_default_quality(config.default_quality)
        .with_tracing(!config.no_tracing)
        .with_shutdown(shutdown);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

/// Wait for Ctrl+C or SIGTERM, then cancel `token`.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    token.cancel();
}
