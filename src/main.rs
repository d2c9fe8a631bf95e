mod config;
mod health;
mod mux;
mod rpc;
mod server;

use crate::{
    config::{
        cli_args::create_match,
        error::ConfigError,
        system::VERSION_STR,
        types::Settings,
    },
    health::check::health_monitor,
    mux::{
        multiplexer::Multiplexer,
        registry::Registry,
    },
    server::accept::{
        accept_request,
        RequestParams,
    },
};

use std::sync::Arc;

use tokio::net::TcpListener;

use hyper::{
    server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;

// jemalloc offers faster mallocs when dealing with lots of threads which is what we're doing
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Get all the cli args and set them
    let settings = Settings::new(create_match())?;
    log_info!("Starting {}", VERSION_STR);

    // Copy the configuration values we need before the records move
    let (addr, strategy, ttl, cache_ttl, do_health_check, health_check_ttl) = (
        settings.address,
        settings.strategy,
        settings.ttl,
        settings.cache_ttl,
        settings.health_check,
        settings.health_check_ttl,
    );

    let registry = Registry::new(settings.records, settings.cooldown_threshold, settings.cooldown);
    if registry.is_empty() {
        log_err!("No usable providers configured!");
        return Err(Box::new(ConfigError::NoProviders) as Box<dyn std::error::Error>);
    }

    let multiplexer = Arc::new(Multiplexer::new(registry, strategy, ttl));
    log_info!("Active providers: {}", multiplexer.names().join(", "));

    // Spawn a thread for the health check
    if do_health_check {
        let multiplexer_health = Arc::clone(&multiplexer);
        tokio::task::spawn(async move {
            health_monitor(multiplexer_health, health_check_ttl, ttl).await;
        });
    }

    let listener = TcpListener::bind(addr).await?;
    log_info!("Bound to: {}", addr);

    let params = RequestParams { cache_ttl };

    // We start a loop to continuously accept incoming connections
    loop {
        let (stream, socketaddr) = listener.accept().await?;
        log_info!("Connection from: {}", socketaddr);

        // Use an adapter to access something implementing `tokio::io` traits as if they implement
        // `hyper::rt` IO traits.
        let io = TokioIo::new(stream);

        let multiplexer_conn = Arc::clone(&multiplexer);

        // Spawn a tokio task to serve multiple connections concurrently
        tokio::task::spawn(async move {
            let service = service_fn(move |tx| {
                accept_request(tx, Arc::clone(&multiplexer_conn), params)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                log_err!("Error serving connection: {}", err);
            }
        });
    }
}
