use crate::rpc::{
    client::RpcClient,
    error::RpcError,
};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// Uniform capability set over one upstream backend.
///
/// Adapters only know how to hand out a usable client and answer a cheap
/// liveness probe. They are stateless with respect to request history, all
/// health bookkeeping lives in the registry.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable identifier, also used as the backend name callers select by.
    fn name(&self) -> &str;

    /// Produce a ready client handle, or fail if the backend can't currently
    /// serve requests.
    async fn acquire_client(&self) -> Result<RpcClient, RpcError>;

    /// Network identity round trip. Never errors, a failed probe is `false`.
    async fn check_availability(&self) -> bool {
        match self.acquire_client().await {
            Ok(client) => client.chain_id().await.is_ok(),
            Err(_) => false,
        }
    }
}

/// Infura backend. Owns nothing but its endpoint, derived from a project id.
pub struct InfuraAdapter {
    name: String,
    url: String,
    client: Client,
}

impl InfuraAdapter {
    pub fn new(name: &str, chain: &str, project_id: &str) -> Self {
        Self {
            name: name.to_string(),
            url: format!("https://{}.infura.io/v3/{}", chain, project_id),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for InfuraAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn acquire_client(&self) -> Result<RpcClient, RpcError> {
        if Url::parse(&self.url).is_err() {
            return Err(RpcError::Unavailable(format!(
                "{} endpoint is malformed",
                self.name
            )));
        }
        Ok(RpcClient::new(self.url.clone(), self.client.clone()))
    }
}

/// Alchemy backend.
pub struct AlchemyAdapter {
    name: String,
    url: String,
    client: Client,
}

impl AlchemyAdapter {
    pub fn new(name: &str, chain: &str, api_key: &str) -> Self {
        Self {
            name: name.to_string(),
            url: format!("https://eth-{}.g.alchemy.com/v2/{}", chain, api_key),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for AlchemyAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn acquire_client(&self) -> Result<RpcClient, RpcError> {
        if Url::parse(&self.url).is_err() {
            return Err(RpcError::Unavailable(format!(
                "{} endpoint is malformed",
                self.name
            )));
        }
        Ok(RpcClient::new(self.url.clone(), self.client.clone()))
    }
}

/// Backend injected by the host environment, the server side analog of a
/// wallet-provided endpoint. Joins the registry either way but reports
/// unavailable while the environment supplies nothing.
pub struct InjectedAdapter {
    name: String,
    url: Option<String>,
    client: Client,
}

impl InjectedAdapter {
    pub fn from_env(name: &str, var: &str) -> Self {
        let url = std::env::var(var).ok().filter(|url| !url.is_empty());

        Self {
            name: name.to_string(),
            url,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for InjectedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn acquire_client(&self) -> Result<RpcClient, RpcError> {
        match &self.url {
            Some(url) => Ok(RpcClient::new(url.clone(), self.client.clone())),
            None => Err(RpcError::Unavailable(format!(
                "{} has no injected endpoint",
                self.name
            ))),
        }
    }
}

/// Any plain JSON-RPC endpoint. Covers every backend we don't special case.
pub struct UrlAdapter {
    name: String,
    url: String,
    client: Client,
}

impl UrlAdapter {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for UrlAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn acquire_client(&self) -> Result<RpcClient, RpcError> {
        if Url::parse(&self.url).is_err() {
            return Err(RpcError::Unavailable(format!(
                "{} endpoint is malformed",
                self.name
            )));
        }
        Ok(RpcClient::new(self.url.clone(), self.client.clone()))
    }
}
