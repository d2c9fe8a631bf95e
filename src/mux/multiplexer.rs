use crate::{
    log_wrn,
    mux::{
        cache::{
            cache_result,
            ResponseCache,
        },
        error::{
            AttemptError,
            FailedAttempt,
            MuxError,
        },
        registry::Registry,
        selection::Strategy,
    },
    rpc::{
        client::RpcClient,
        error::RpcError,
    },
};

use serde_json::Value;

use std::{
    future::Future,
    time::Duration,
};

use tokio::time::timeout;

/// Runs caller supplied operations against "some healthy provider".
///
/// Orchestrates selection, retry and the response cache. One attempt per
/// registry entry per call, so a fully dead provider set costs bounded time
/// and one bad backend degrades throughput without blocking the rest.
pub struct Multiplexer {
    registry: Registry,
    strategy: Strategy,
    cache: ResponseCache,
    ttl: Duration, // per attempt upstream budget, zero disables
}

impl Multiplexer {
    pub fn new(registry: Registry, strategy: Strategy, ttl: Duration) -> Self {
        Self {
            registry,
            strategy,
            cache: ResponseCache::new(),
            ttl,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn names(&self) -> Vec<String> {
        self.registry.names()
    }

    // Reject backend identifiers we don't know before any provider is contacted
    pub fn validate_network(&self, network: &str) -> Result<(), MuxError> {
        if self.registry.contains(network) {
            return Ok(());
        }

        Err(MuxError::InvalidNetworkSelection(network.to_string()))
    }

    pub async fn execute<F, Fut>(&self, operation: F) -> Result<Value, MuxError>
    where
        F: Fn(RpcClient) -> Fut,
        Fut: Future<Output = Result<Value, RpcError>>,
    {
        self.run(operation, None, Duration::ZERO).await
    }

    pub async fn execute_cached<F, Fut>(
        &self,
        operation: F,
        cache_key: &str,
        cache_ttl: Duration,
    ) -> Result<Value, MuxError>
    where
        F: Fn(RpcClient) -> Fut,
        Fut: Future<Output = Result<Value, RpcError>>,
    {
        self.run(operation, Some(cache_key), cache_ttl).await
    }

    async fn run<F, Fut>(
        &self,
        operation: F,
        cache_key: Option<&str>,
        cache_ttl: Duration,
    ) -> Result<Value, MuxError>
    where
        F: Fn(RpcClient) -> Fut,
        Fut: Future<Output = Result<Value, RpcError>>,
    {
        if let Some(key) = cache_key {
            if let Some(hit) = self.cache.lookup(key) {
                return Ok(hit);
            }
        }

        // One attempt per registry entry, never more. Bounds latency and
        // guarantees termination even when every backend is down at once.
        let attempts = self.registry.len();
        let mut failures: Vec<FailedAttempt> = Vec::new();

        for _ in 0..attempts {
            let position = match self.strategy.pick(&self.registry).await {
                Ok(position) => position,
                Err(rejected) => {
                    failures.extend(rejected);
                    break;
                }
            };

            let adapter = self.registry.adapter(position);
            let name = adapter.name().to_string();

            let client = match self.bounded(adapter.acquire_client()).await {
                Ok(client) => client,
                Err(err) => {
                    self.registry.record_failure(position);
                    log_wrn!("{} can't produce a client: {}", name, err);
                    failures.push(FailedAttempt {
                        provider: name,
                        error: AttemptError::ProviderUnavailable(err.to_string()),
                    });
                    continue;
                }
            };

            match self.bounded(operation(client)).await {
                Ok(result) => {
                    self.registry.record_success(position);
                    if let Some(key) = cache_key {
                        if cache_result(&result.to_string()) {
                            self.cache.store(key, result.clone(), cache_ttl);
                        }
                    }
                    return Ok(result);
                }
                Err(err) => {
                    self.registry.record_failure(position);
                    log_wrn!("{} failed to serve the request: {}", name, err);
                    failures.push(FailedAttempt {
                        provider: name,
                        error: AttemptError::UpstreamRequestFailed(err.to_string()),
                    });
                }
            }
        }

        Err(MuxError::AllProvidersExhausted(failures))
    }

    // Apply the per attempt budget if one is configured
    async fn bounded<T>(
        &self,
        request: impl Future<Output = Result<T, RpcError>>,
    ) -> Result<T, RpcError> {
        if self.ttl.is_zero() {
            return request.await;
        }

        match timeout(self.ttl, request).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::TimedOut),
        }
    }
}
