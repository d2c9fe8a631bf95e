use crate::{
    bad_request,
    config::system::VERSION_STR,
    log_err,
    log_info,
    mux::{
        error::MuxError,
        multiplexer::Multiplexer,
    },
    not_found,
    rpc::client::format_ether,
    rpc_response,
};

use http_body_util::{
    BodyExt,
    Full,
};
use hyper::{
    body::{
        Bytes,
        Incoming,
    },
    Method,
    Request,
    Response,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use std::{
    convert::Infallible,
    sync::{
        Arc,
        OnceLock,
    },
    time::{
        Duration,
        Instant,
    },
};

// Per request knobs copied out of the settings at accept time
#[derive(Debug, Clone, Copy)]
pub struct RequestParams {
    pub cache_ttl: Duration,
}

#[derive(Debug, Deserialize)]
struct BalanceRequest {
    address: String,
    network: String,
}

// Addresses are 20 hex bytes behind a 0x prefix. Anything else never
// reaches a provider.
fn valid_address(address: &str) -> bool {
    static ADDRESS_RE: OnceLock<Regex> = OnceLock::new();
    ADDRESS_RE
        .get_or_init(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap())
        .is_match(address)
}

pub async fn accept_request(
    tx: Request<Incoming>,
    multiplexer: Arc<Multiplexer>,
    params: RequestParams,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (tx.method(), tx.uri().path()) {
        (&Method::POST, "/balance") => balance(tx, multiplexer, params).await,
        (&Method::GET, "/block_number") => block_number(multiplexer).await,
        (&Method::GET, "/") => {
            rpc_response!(200, json!({ "version": VERSION_STR }).to_string())
        }
        _ => not_found!(),
    }
}

async fn balance(
    tx: Request<Incoming>,
    multiplexer: Arc<Multiplexer>,
    params: RequestParams,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let body = match tx.into_body().collect().await {
        Ok(body) => body.to_bytes(),
        Err(err) => return bad_request!(format!("can't read request body: {}", err)),
    };

    let request: BalanceRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => return bad_request!(format!("invalid request: {}", err)),
    };

    if !valid_address(&request.address) {
        return bad_request!(format!("'{}' is not a valid address", request.address));
    }

    // Unknown backends get rejected before any provider is contacted
    if let Err(err) = multiplexer.validate_network(&request.network) {
        return bad_request!(err.to_string());
    }

    let cache_key = format!("bal:{}:{}", request.network, request.address);
    let address = request.address.clone();

    let time = Instant::now();
    let result = multiplexer
        .execute_cached(
            move |client| {
                let address = address.clone();
                async move {
                    let wei = client.get_balance(&address).await?;
                    Ok(json!({
                        "balance": format_ether(wei),
                        "wei": wei.to_string(),
                    }))
                }
            },
            &cache_key,
            params.cache_ttl,
        )
        .await;
    log_info!("Request time: {:?}", time.elapsed());

    match result {
        Ok(result) => rpc_response!(200, result.to_string()),
        Err(err) => {
            log_err!("Error fetching balance: {}", err);
            mux_error_response(err)
        }
    }
}

async fn block_number(multiplexer: Arc<Multiplexer>) -> Result<Response<Full<Bytes>>, Infallible> {
    let time = Instant::now();
    let result = multiplexer
        .execute(|client| async move { client.block_number().await.map(|number| json!(number)) })
        .await;
    log_info!("Request time: {:?}", time.elapsed());

    match result {
        Ok(number) => rpc_response!(200, json!({ "block_number": number }).to_string()),
        Err(err) => {
            log_err!("Error fetching block number: {}", err);
            mux_error_response(err)
        }
    }
}

// Exhaustion keeps every per-provider cause so callers can tell what died
// without knowing anything about the retry mechanics.
fn mux_error_response(err: MuxError) -> Result<Response<Full<Bytes>>, Infallible> {
    match err {
        MuxError::AllProvidersExhausted(failures) => {
            let causes: Vec<String> = failures
                .iter()
                .map(|failure| failure.to_string())
                .collect();
            rpc_response!(
                400,
                json!({ "error": "all providers exhausted", "causes": causes }).to_string()
            )
        }
        other => bad_request!(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_address() {
        assert!(valid_address(
            "0x407d73d8a49eeb85d32cf465507dd71d507100c1"
        ));
        assert!(!valid_address("0x407d73d8"));
        assert!(!valid_address(
            "407d73d8a49eeb85d32cf465507dd71d507100c1ab"
        ));
        assert!(!valid_address(
            "0x407d73d8a49eeb85d32cf465507dd71d507100zz"
        ));
    }
}
