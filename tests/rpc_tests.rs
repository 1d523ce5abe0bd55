//! Sui JSON-RPC client against a mock fullnode.
#![cfg(feature = "rpc-client")]

use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::json;
use std::net::TcpListener;
use walrus_deploy_rs::{DeployError, SuiRpcClient};

const OWNER: &str = "0x00000000000000000000000000000000000000000000000000000000000000a1";
const WAL: &str = "0x8270feb7375eee355e64fdb69c50abb6b5f9393a722883c1cf45f8e26048810a::wal::WAL";

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

#[tokio::test]
async fn balance_and_gas_price() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start();

    let balance = server.mock(|when, then| {
        when.method(POST).path("/").body_contains("suix_getBalance");
        then.status(200).json_body(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "coinType": "0x2::sui::SUI",
                "coinObjectCount": 2,
                "totalBalance": "2500000000",
                "lockedBalance": {}
            }
        }));
    });
    let gas = server.mock(|when, then| {
        when.method(POST)
            .path("/")
            .body_contains("suix_getReferenceGasPrice");
        then.status(200)
            .json_body(json!({"jsonrpc": "2.0", "id": 1, "result": "750"}));
    });

    let client = SuiRpcClient::new(server.url("/")).unwrap();
    assert_eq!(client.get_balance(OWNER, None).await.unwrap(), 2_500_000_000);
    assert_eq!(client.reference_gas_price().await.unwrap(), 750);
    balance.assert();
    gas.assert();
}

#[tokio::test]
async fn last_transaction_spend_sums_debits() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST)
            .path("/")
            .body_contains("suix_queryTransactionBlocks")
            .body_contains("FromAddress")
            .body_contains("showBalanceChanges");
        then.status(200).json_body(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "data": [{
                    "digest": "9XkQ",
                    "balanceChanges": [
                        {"owner": {"AddressOwner": OWNER}, "coinType": "0x2::sui::SUI", "amount": "-12500000"},
                        {"owner": {"AddressOwner": OWNER}, "coinType": WAL, "amount": "-250000000"},
                        {"owner": {"AddressOwner": "0xbeef"}, "coinType": WAL, "amount": "250000000"}
                    ]
                }],
                "nextCursor": "9XkQ",
                "hasNextPage": true
            }
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/")
            .body_contains("suix_getCoinMetadata")
            .body_contains("::sui::SUI");
        then.status(200).json_body(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"decimals": 9, "symbol": "SUI", "name": "Sui"}
        }));
    });
    // WAL metadata unavailable: decimals fall back to 9.
    server.mock(|when, then| {
        when.method(POST)
            .path("/")
            .body_contains("suix_getCoinMetadata")
            .body_contains("::wal::WAL");
        then.status(200)
            .json_body(json!({"jsonrpc": "2.0", "id": 1, "result": null}));
    });

    let client = SuiRpcClient::new(server.url("/")).unwrap();
    let report = client.last_transaction_spend(OWNER).await.unwrap().unwrap();

    assert_eq!(report.digest, "9XkQ");
    assert_eq!(report.spends.len(), 2);
    assert!((report.sui_spent() - 0.0125).abs() < 1e-12);
    assert!((report.wal_spent() - 0.25).abs() < 1e-12);
    let wal = report.spends.iter().find(|s| s.coin_type == WAL).unwrap();
    assert_eq!(wal.decimals, 9);
    assert_eq!(wal.symbol, "WAL");
}

#[tokio::test]
async fn no_transactions_is_none() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/");
        then.status(200).json_body(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"data": [], "nextCursor": null, "hasNextPage": false}
        }));
    });

    let client = SuiRpcClient::new(server.url("/")).unwrap();
    assert!(client.last_transaction_spend(OWNER).await.unwrap().is_none());
}

#[tokio::test]
async fn rpc_errors_are_typed() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/").body_contains("suix_getBalance");
        then.status(200).json_body(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32602, "message": "Invalid params"}
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/")
            .body_contains("suix_getReferenceGasPrice");
        then.status(429).body("Too Many Requests");
    });

    let client = SuiRpcClient::new(server.url("/")).unwrap();

    let err = client.get_balance(OWNER, None).await.unwrap_err();
    assert!(matches!(err, DeployError::Rpc(ref m) if m.contains("Invalid params")));
    assert!(err.is_recoverable());

    let err = client.reference_gas_price().await.unwrap_err();
    assert!(matches!(err, DeployError::Rpc(ref m) if m.contains("429")));
}
