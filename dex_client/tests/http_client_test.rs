use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    routing::get,
    Router,
};
use config_manager::SystemConfig;
use dex_client::{ShyftClient, SolanaTrackerClient};
use rate_limiter::Unthrottled;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use wallet_core::{
    HistoryPaginator, PoolInfoSource, SourceError, TradeClassifier, TransactionHistorySource,
    WalletPnlSource,
};

const API_KEY: &str = "test-key";
const WALLET: &str = "GBJ4MZe8fqpA6UVgjh19BwJPMb79KDfMv78XnFVxgH2Q";

type Seen = Arc<Mutex<Vec<HashMap<String, String>>>>;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("x-api-key").and_then(|v| v.to_str().ok()) == Some(API_KEY)
}

fn shyft_client(base_url: String) -> ShyftClient {
    let mut config = SystemConfig::default().shyft;
    config.api_base_url = base_url;
    config.api_key = API_KEY.to_string();
    ShyftClient::new(config, Arc::new(Unthrottled::new("shyft"))).unwrap()
}

fn tracker_client(base_url: String) -> SolanaTrackerClient {
    let mut config = SystemConfig::default().solana_tracker;
    config.api_base_url = base_url;
    config.api_key = API_KEY.to_string();
    SolanaTrackerClient::new(config, Arc::new(Unthrottled::new("solana_tracker"))).unwrap()
}

fn shyft_history_app(seen: Seen) -> Router {
    Router::new().route(
        "/transaction/history",
        get(
            move |Query(query): Query<HashMap<String, String>>, headers: HeaderMap| {
                let seen = seen.clone();
                async move {
                    if !authorized(&headers) {
                        return (StatusCode::UNAUTHORIZED, "missing api key".to_string());
                    }
                    seen.lock().unwrap().push(query);
                    (
                        StatusCode::OK,
                        include_str!("fixtures/shyft_history.json").to_string(),
                    )
                }
            },
        ),
    )
}

#[tokio::test]
async fn test_shyft_latest_and_page_requests() {
    let seen: Seen = Arc::default();
    let base_url = serve(shyft_history_app(seen.clone())).await;
    let client = shyft_client(base_url);

    let latest = client.latest_transaction(WALLET).await.unwrap().unwrap();
    assert!(latest.signature.starts_with("5h6xBEau"));
    assert_eq!(latest.block_time.timestamp(), 1_700_000_000);

    let batch = client
        .transactions_before(WALLET, &latest.signature, 100)
        .await
        .unwrap();
    assert_eq!(batch.transactions.len(), 3);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0]["tx_num"], "1");
    assert_eq!(seen[0]["network"], "mainnet-beta");
    assert_eq!(seen[0]["account"], WALLET);
    assert_eq!(seen[0]["enable_raw"], "true");
    assert!(!seen[0].contains_key("before_tx_signature"));
    assert_eq!(seen[1]["tx_num"], "100");
    assert_eq!(seen[1]["before_tx_signature"], latest.signature);
}

#[tokio::test]
async fn test_shyft_empty_result_means_no_transactions() {
    let app = Router::new().route(
        "/transaction/history",
        get(|| async { r#"{"success":true,"message":"ok","result":[]}"# }),
    );
    let client = shyft_client(serve(app).await);

    assert!(client.latest_transaction(WALLET).await.unwrap().is_none());
    assert!(client
        .transactions_before(WALLET, "sig", 100)
        .await
        .unwrap()
        .is_exhausted());
}

fn shyft_record(signature: &str, block_time: Option<i64>) -> serde_json::Value {
    let mut record = serde_json::json!({
        "signatures": [signature],
        "status": "Success",
        "actions": [{
            "type": "SWAP",
            "info": {
                "tokens_swapped": {
                    "in": { "symbol": "SOL", "token_address": "So11111111111111111111111111111111111111112", "amount": 1.5 },
                    "out": { "symbol": "GEM", "token_address": "gem_mint", "amount": 1000 }
                }
            }
        }]
    });
    if let Some(block_time) = block_time {
        record["raw"] = serde_json::json!({ "blockTime": block_time });
    }
    record
}

#[tokio::test]
async fn test_history_continues_past_page_of_malformed_records() {
    let app = Router::new().route(
        "/transaction/history",
        get(|Query(query): Query<HashMap<String, String>>| async move {
            let result = match query.get("before_tx_signature").map(String::as_str) {
                None => vec![shyft_record("anchor", Some(1_700_000_000))],
                Some("anchor") => vec![shyft_record("m1", None), shyft_record("m2", None)],
                Some("m2") => vec![shyft_record("g1", Some(1_699_996_400))],
                _ => Vec::new(),
            };
            axum::Json(serde_json::json!({ "success": true, "message": "ok", "result": result }))
        }),
    );
    let client = shyft_client(serve(app).await);
    let paginator = HistoryPaginator::new(client, TradeClassifier::new("SOL"));

    let history = paginator
        .fetch_history(WALLET, Some(chrono::Duration::days(7)))
        .await
        .unwrap();

    let signatures: Vec<_> = history.iter().map(|t| t.signature.as_str()).collect();
    assert_eq!(signatures, vec!["g1"]);
    assert_eq!(history.pages_fetched, 3);
}

#[tokio::test]
async fn test_shyft_rate_limit_is_reported() {
    let app = Router::new().route(
        "/transaction/history",
        get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let client = shyft_client(serve(app).await);

    let err = client.latest_transaction(WALLET).await.unwrap_err();
    assert_eq!(err, SourceError::RateLimit { provider: "shyft" });
}

#[tokio::test]
async fn test_shyft_server_error_is_api_error() {
    let app = Router::new().route(
        "/transaction/history",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let client = shyft_client(serve(app).await);

    match client.transactions_before(WALLET, "sig", 100).await {
        Err(SourceError::Api { provider, message }) => {
            assert_eq!(provider, "shyft");
            assert!(message.contains("500"));
            assert!(message.contains("boom"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_shyft_success_false_is_api_error() {
    let app = Router::new().route(
        "/transaction/history",
        get(|| async { r#"{"success":false,"message":"Invalid account","result":null}"# }),
    );
    let client = shyft_client(serve(app).await);

    let err = client.latest_transaction(WALLET).await.unwrap_err();
    assert!(matches!(err, SourceError::Api { .. }));
    assert!(err.to_string().contains("Invalid account"));
}

#[tokio::test]
async fn test_tracker_pool_info_and_pnl() {
    let seen: Seen = Arc::default();
    let pnl_seen = seen.clone();
    let app = Router::new()
        .route(
            "/tokens/:token",
            get(|Path(token): Path<String>, headers: HeaderMap| async move {
                if !authorized(&headers) {
                    return (StatusCode::UNAUTHORIZED, String::new());
                }
                if token == "unknown" {
                    return (StatusCode::NOT_FOUND, r#"{"error":"Token not found"}"#.to_string());
                }
                (StatusCode::OK, include_str!("fixtures/token_info.json").to_string())
            }),
        )
        .route(
            "/pnl/:wallet",
            get(move |Query(query): Query<HashMap<String, String>>| {
                let seen = pnl_seen.clone();
                async move {
                    seen.lock().unwrap().push(query);
                    include_str!("fixtures/wallet_pnl.json")
                }
            }),
        );
    let client = tracker_client(serve(app).await);

    let pool = client
        .token_pool_info("7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr")
        .await
        .unwrap();
    assert_eq!(pool.earliest_pool_creation_time.timestamp(), 1_699_999_950);

    let err = client.token_pool_info("unknown").await.unwrap_err();
    assert_eq!(err.provider(), "solana_tracker");

    let pnl = client.wallet_pnl(WALLET).await.unwrap();
    assert_eq!(pnl.total_invested.to_string(), "10000");
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0]["showHistoricPnL"], "true");
    assert_eq!(seen[0]["hideDetails"], "true");
}

#[tokio::test]
async fn test_tracker_token_without_pools_is_an_error() {
    let app = Router::new().route(
        "/tokens/:token",
        get(|| async { r#"{"token":{"mint":"x"},"pools":[]}"# }),
    );
    let client = tracker_client(serve(app).await);

    let err = client.token_pool_info("x").await.unwrap_err();
    assert!(matches!(err, SourceError::InvalidResponse { .. }));
}

#[tokio::test]
async fn test_tracker_garbage_body_is_invalid_response() {
    let app = Router::new().route("/pnl/:wallet", get(|| async { "<html>oops</html>" }));
    let client = tracker_client(serve(app).await);

    let err = client.wallet_pnl(WALLET).await.unwrap_err();
    assert!(matches!(err, SourceError::InvalidResponse { .. }));
}

#[tokio::test]
async fn test_tracker_trades_cursor_is_forwarded() {
    let seen: Seen = Arc::default();
    let trades_seen = seen.clone();
    let app = Router::new().route(
        "/trades/:token",
        get(move |Query(query): Query<HashMap<String, String>>| {
            let seen = trades_seen.clone();
            async move {
                seen.lock().unwrap().push(query);
                include_str!("fixtures/token_trades.json")
            }
        }),
    );
    let client = tracker_client(serve(app).await);

    let first = client.get_token_trades("mint", None).await.unwrap();
    let cursor = first.cursor().unwrap();
    client.get_token_trades("mint", Some(&cursor)).await.unwrap();

    let seen = seen.lock().unwrap();
    assert!(!seen[0].contains_key("cursor"));
    assert_eq!(seen[0]["hideArb"], "true");
    assert_eq!(seen[1]["cursor"], "1699999999000");
}

#[tokio::test]
#[ignore] // Requires SHYFT_API_KEY and network access
async fn test_live_shyft_latest_transaction() {
    let mut config = SystemConfig::default().shyft;
    config.api_key = std::env::var("SHYFT_API_KEY").unwrap();
    let client = ShyftClient::new(config, Arc::new(Unthrottled::new("shyft"))).unwrap();

    let latest = client.latest_transaction(WALLET).await.unwrap();
    println!("Latest transaction: {:?}", latest);
}
