//! Canned hyper responses. Builder output is infallible for these shapes,
//! hence the unwraps.

#[macro_export]
macro_rules! rpc_response {
    (
        $status:expr,
        $body:expr
    ) => {
        Ok(hyper::Response::builder()
            .status($status)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(http_body_util::Full::new(hyper::body::Bytes::from($body)))
            .unwrap())
    };
}

#[macro_export]
macro_rules! bad_request {
    ($msg:expr) => {
        $crate::rpc_response!(400, serde_json::json!({ "error": $msg }).to_string())
    };
}

#[macro_export]
macro_rules! not_found {
    () => {
        $crate::rpc_response!(
            404,
            serde_json::json!({ "error": "not found" }).to_string()
        )
    };
}
