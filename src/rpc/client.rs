use crate::rpc::error::RpcError;
use reqwest::Client;
use serde_json::{
    json,
    Value,
};
use url::Url;

// One wei-denominated ether
const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// A ready-to-use JSON-RPC client handle for one upstream node.
///
/// Produced by a `ProviderAdapter` per request. Cheap to clone and move around,
/// the underlying reqwest client keeps its connection pool.
#[derive(Debug, Clone)]
pub struct RpcClient {
    pub name: String, // sanitized name for appearing in logs
    url: String,      // url of the node we're sending requests to.
    client: Client,   // Reqwest client
}

// Sanitizes URLs so secrets don't get outputed.
//
// For example, if we have a URL: https://eth-mainnet.g.alchemy.com/v2/api-key
// as input, we output: https://eth-mainnet.g.alchemy.com/
pub fn sanitize_url(url: &str) -> Result<String, url::ParseError> {
    let parsed_url = Url::parse(url)?;

    // Build a new URL with the scheme, host, and port (if any), but without the path or query
    let sanitized = Url::parse(&format!(
        "{}://{}{}",
        parsed_url.scheme(),
        parsed_url.host_str().unwrap_or_default(),
        match parsed_url.port() {
            Some(port) => format!(":{}", port),
            None => String::new(),
        }
    ))?;

    Ok(sanitized.to_string())
}

impl RpcClient {
    pub fn new(url: String, client: Client) -> Self {
        Self {
            name: sanitize_url(&url).unwrap_or_else(|_| url.clone()),
            url,
            client,
        }
    }

    // Explicitly get the url of the client, potentially dangerous as it can expose basic auth
    #[cfg(test)]
    pub fn get_url(&self) -> String {
        self.url.clone()
    }

    // Generic fn to send a json-rpc request and extract its result
    pub async fn send_request(&self, tx: Value) -> Result<Value, RpcError> {
        #[cfg(feature = "debug-verbose")]
        println!("Sending request: {}", tx.clone());
        let response = match self.client.post(&self.url).json(&tx).send().await {
            Ok(response) => response,
            Err(err) => return Err(RpcError::Unresponsive(err.to_string())),
        };

        let mut body: Value = match response.json().await {
            Ok(body) => body,
            Err(err) => return Err(RpcError::InvalidResponse(err.to_string())),
        };
        #[cfg(feature = "debug-verbose")]
        println!("response: {}", body);

        if !body["error"].is_null() {
            return Err(RpcError::InvalidResponse(body["error"].to_string()));
        }

        match body.get_mut("result") {
            Some(result) => Ok(result.take()),
            None => Err(RpcError::InvalidResponse(
                "error: Response is missing a result!".to_string(),
            )),
        }
    }

    // Request the balance of an address at the latest block, in wei
    pub async fn get_balance(&self, address: &str) -> Result<u128, RpcError> {
        let request = json!({
            "method": "eth_getBalance".to_string(),
            "params": [address, "latest"],
            "id": 1,
            "jsonrpc": "2.0".to_string(),
        });

        let result = self.send_request(request).await?;
        let wei = match result.as_str() {
            Some(wei) => wei,
            None => {
                return Err(RpcError::InvalidResponse(
                    "error: Can't get balance!".to_string(),
                ))
            }
        };

        hex_to_wei(wei).map_err(|err| RpcError::InvalidResponse(err.to_string()))
    }

    // Request blocknumber and return its value
    pub async fn block_number(&self) -> Result<u64, RpcError> {
        let request = json!({
            "method": "eth_blockNumber".to_string(),
            "params": serde_json::Value::Null,
            "id": 1,
            "jsonrpc": "2.0".to_string(),
        });

        let result = self.send_request(request).await?;
        let number = match result.as_str() {
            Some(number) => number,
            None => {
                return Err(RpcError::InvalidResponse(
                    "error: Can't get block number!".to_string(),
                ))
            }
        };

        hex_to_decimal(number).map_err(|err| RpcError::InvalidResponse(err.to_string()))
    }

    // Network identity round trip, used as the liveness probe
    pub async fn chain_id(&self) -> Result<u64, RpcError> {
        let request = json!({
            "method": "eth_chainId".to_string(),
            "params": serde_json::Value::Null,
            "id": 1,
            "jsonrpc": "2.0".to_string(),
        });

        let result = self.send_request(request).await?;
        let id = match result.as_str() {
            Some(id) => id,
            None => {
                return Err(RpcError::InvalidResponse(
                    "error: Can't get chain id!".to_string(),
                ))
            }
        };

        hex_to_decimal(id).map_err(|err| RpcError::InvalidResponse(err.to_string()))
    }
}

pub fn hex_to_decimal(hex_string: &str) -> Result<u64, std::num::ParseIntError> {
    let hex_string: &str = &hex_string.replace('\"', "");

    // Remove `0x` prefix if it exists
    let hex_string = hex_string.trim_start_matches("0x");

    u64::from_str_radix(hex_string, 16)
}

// Wei balances overflow u64 past ~18 ether so they get their own, wider parser
pub fn hex_to_wei(hex_string: &str) -> Result<u128, std::num::ParseIntError> {
    let hex_string: &str = &hex_string.replace('\"', "");
    let hex_string = hex_string.trim_start_matches("0x");

    u128::from_str_radix(hex_string, 16)
}

// Display conversion only. Correctness-relevant math stays in wei.
pub fn format_ether(wei: u128) -> String {
    let whole = wei / WEI_PER_ETHER;
    let frac = wei % WEI_PER_ETHER;

    if frac == 0 {
        return format!("{}.0", whole);
    }

    let frac = format!("{:018}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_url() {
        let url = "https://eth-mainnet.g.alchemy.com/v2/super-secret-key";
        assert_eq!(
            sanitize_url(url).unwrap(),
            "https://eth-mainnet.g.alchemy.com/"
        );

        let url = "http://localhost:8545/";
        assert_eq!(sanitize_url(url).unwrap(), "http://localhost:8545/");
    }

    #[test]
    fn test_hex_to_decimal() {
        assert_eq!(hex_to_decimal("0x10").unwrap(), 16);
        assert_eq!(hex_to_decimal("\"0x1b4\"").unwrap(), 436);
        assert!(hex_to_decimal("not hex").is_err());
    }

    #[test]
    fn test_hex_to_wei() {
        assert_eq!(hex_to_wei("0x1bc16d674ec80000").unwrap(), 2 * WEI_PER_ETHER);
        // 20 ether overflows a u64
        assert_eq!(hex_to_wei("0x1158e460913d00000").unwrap(), 20 * WEI_PER_ETHER);
        assert_eq!(hex_to_wei("0x0").unwrap(), 0);
    }

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(0), "0.0");
        assert_eq!(format_ether(WEI_PER_ETHER), "1.0");
        assert_eq!(format_ether(WEI_PER_ETHER / 2), "0.5");
        assert_eq!(format_ether(1), "0.000000000000000001");
        assert_eq!(format_ether(3 * WEI_PER_ETHER / 2), "1.5");
    }
}
