//! Sui JSON-RPC client.
//!
//! Only the handful of read calls the deploy tool needs: wallet balance,
//! reference gas price, and what the wallet's latest transaction spent.
//! Every call is bounded by the client timeout and is best-effort for the
//! callers that use it for display.

use crate::error::DeployError;
use crate::types::Network;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Default request timeout.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Decimals assumed when a coin has no metadata.
pub const FALLBACK_DECIMALS: u8 = 9;

pub const SUI_COIN_TYPE: &str = "0x2::sui::SUI";

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceResult {
    total_balance: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxPage {
    #[serde(default)]
    data: Vec<TxBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxBlock {
    digest: String,
    #[serde(default)]
    balance_changes: Vec<BalanceChange>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChange {
    pub owner: Value,
    pub coin_type: String,
    pub amount: String,
}

impl BalanceChange {
    /// Address of an `AddressOwner`; other owner kinds yield `None`.
    pub fn address_owner(&self) -> Option<&str> {
        self.owner.get("AddressOwner").and_then(Value::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct CoinMetadata {
    decimals: u8,
    #[serde(default)]
    symbol: String,
}

/// Amount of one coin type spent by a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct CoinSpend {
    pub coin_type: String,
    pub symbol: String,
    /// Smallest-unit amount, positive.
    pub raw_amount: u128,
    pub decimals: u8,
}

impl CoinSpend {
    /// Amount in display units.
    pub fn amount(&self) -> f64 {
        self.raw_amount as f64 / 10f64.powi(i32::from(self.decimals))
    }
}

/// What the wallet's most recent transaction cost.
#[derive(Debug, Clone, PartialEq)]
pub struct SpendReport {
    pub digest: String,
    pub spends: Vec<CoinSpend>,
}

impl SpendReport {
    pub fn sui_spent(&self) -> f64 {
        self.spent_matching("::sui::SUI")
    }

    pub fn wal_spent(&self) -> f64 {
        self.spent_matching("::wal::WAL")
    }

    fn spent_matching(&self, suffix: &str) -> f64 {
        self.spends
            .iter()
            .filter(|s| s.coin_type.ends_with(suffix))
            .map(CoinSpend::amount)
            .sum()
    }
}

/// Sum the negative balance deltas of `owner`, per coin type.
///
/// Positive deltas (refunds, received coins) are ignored; amounts are
/// returned as positive magnitudes.
pub fn sum_outflows(changes: &[BalanceChange], owner: &str) -> BTreeMap<String, u128> {
    let mut totals = BTreeMap::new();
    for change in changes {
        if !change
            .address_owner()
            .is_some_and(|a| a.eq_ignore_ascii_case(owner))
        {
            continue;
        }
        let Ok(delta) = change.amount.trim().parse::<i128>() else {
            debug!(amount = %change.amount, "skipping unparseable balance change");
            continue;
        };
        if delta < 0 {
            *totals.entry(change.coin_type.clone()).or_insert(0) += delta.unsigned_abs();
        }
    }
    totals
}

/// Minimal Sui JSON-RPC client.
#[derive(Debug, Clone)]
pub struct SuiRpcClient {
    http: reqwest::Client,
    url: String,
}

impl SuiRpcClient {
    pub fn new(url: impl Into<String>) -> Result<Self, DeployError> {
        Self::with_timeout(url, DEFAULT_RPC_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, DeployError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeployError::Rpc(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    /// Client for the network's public fullnode.
    pub fn for_network(network: Network) -> Result<Self, DeployError> {
        Self::new(network.default_rpc_url())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, DeployError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        debug!(method, url = %self.url, "rpc call");

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeployError::Rpc(format!("{} request failed: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response".to_string());
            return Err(DeployError::Rpc(format!(
                "{} failed ({}): {}",
                method, status, text
            )));
        }

        let parsed: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| DeployError::Rpc(format!("{}: malformed response: {}", method, e)))?;

        if let Some(err) = parsed.error {
            return Err(DeployError::Rpc(format!(
                "{} error {}: {}",
                method, err.code, err.message
            )));
        }
        parsed
            .result
            .ok_or_else(|| DeployError::Rpc(format!("{}: empty result", method)))
    }

    /// Total balance of `coin_type` (SUI when `None`) in smallest units.
    pub async fn get_balance(
        &self,
        address: &str,
        coin_type: Option<&str>,
    ) -> Result<u128, DeployError> {
        let coin = coin_type.unwrap_or(SUI_COIN_TYPE);
        let result: BalanceResult = self
            .call("suix_getBalance", json!([address, coin]))
            .await?;
        result
            .total_balance
            .parse()
            .map_err(|_| DeployError::Rpc(format!("invalid balance '{}'", result.total_balance)))
    }

    /// Current reference gas price in MIST.
    pub async fn reference_gas_price(&self) -> Result<u64, DeployError> {
        let result: Value = self.call("suix_getReferenceGasPrice", json!([])).await?;
        let price = match &result {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_u64(),
            _ => None,
        };
        price.ok_or_else(|| DeployError::Rpc(format!("invalid gas price {}", result)))
    }

    /// Decimals and symbol for `coin_type`, or the fallback when unknown.
    async fn coin_metadata(&self, coin_type: &str) -> (u8, String) {
        let fallback_symbol = coin_type.rsplit("::").next().unwrap_or(coin_type).to_string();
        match self
            .call::<Option<CoinMetadata>>("suix_getCoinMetadata", json!([coin_type]))
            .await
        {
            Ok(Some(meta)) => {
                let symbol = if meta.symbol.is_empty() {
                    fallback_symbol
                } else {
                    meta.symbol
                };
                (meta.decimals, symbol)
            }
            Ok(None) => (FALLBACK_DECIMALS, fallback_symbol),
            Err(e) => {
                debug!(coin_type, error = %e, "coin metadata unavailable");
                (FALLBACK_DECIMALS, fallback_symbol)
            }
        }
    }

    /// What `address`'s most recent transaction spent, per coin type.
    ///
    /// `Ok(None)` when the address has sent no transactions.
    pub async fn last_transaction_spend(
        &self,
        address: &str,
    ) -> Result<Option<SpendReport>, DeployError> {
        let query = json!({
            "filter": { "FromAddress": address },
            "options": { "showBalanceChanges": true },
        });
        let page: TxPage = self
            .call("suix_queryTransactionBlocks", json!([query, null, 1, true]))
            .await?;

        let Some(tx) = page.data.into_iter().next() else {
            return Ok(None);
        };

        let mut spends = Vec::new();
        for (coin_type, raw_amount) in sum_outflows(&tx.balance_changes, address) {
            let (decimals, symbol) = self.coin_metadata(&coin_type).await;
            spends.push(CoinSpend {
                coin_type,
                symbol,
                raw_amount,
                decimals,
            });
        }

        Ok(Some(SpendReport {
            digest: tx.digest,
            spends,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(owner: &str, coin: &str, amount: &str) -> BalanceChange {
        BalanceChange {
            owner: json!({ "AddressOwner": owner }),
            coin_type: coin.to_string(),
            amount: amount.to_string(),
        }
    }

    #[test]
    fn test_sum_outflows_only_counts_owner_debits() {
        let changes = vec![
            change("0xabc", SUI_COIN_TYPE, "-1500"),
            change("0xabc", SUI_COIN_TYPE, "-500"),
            change("0xabc", "0x9::wal::WAL", "-42"),
            change("0xabc", "0x9::wal::WAL", "10"),
            change("0xdef", SUI_COIN_TYPE, "-999"),
            change("0xabc", SUI_COIN_TYPE, "garbage"),
        ];
        let totals = sum_outflows(&changes, "0xABC");
        assert_eq!(totals.get(SUI_COIN_TYPE), Some(&2000));
        assert_eq!(totals.get("0x9::wal::WAL"), Some(&42));
        assert_eq!(totals.len(), 2);
    }

    #[test]
    fn test_shared_owner_ignored() {
        let c = BalanceChange {
            owner: json!({ "Shared": { "initial_shared_version": 1 } }),
            coin_type: SUI_COIN_TYPE.to_string(),
            amount: "-1".to_string(),
        };
        assert!(c.address_owner().is_none());
        assert!(sum_outflows(&[c], "0xabc").is_empty());
    }

    #[test]
    fn test_spend_report_amounts() {
        let report = SpendReport {
            digest: "D1".into(),
            spends: vec![
                CoinSpend {
                    coin_type: SUI_COIN_TYPE.into(),
                    symbol: "SUI".into(),
                    raw_amount: 2_500_000_000,
                    decimals: 9,
                },
                CoinSpend {
                    coin_type: "0x9::wal::WAL".into(),
                    symbol: "WAL".into(),
                    raw_amount: 500_000_000,
                    decimals: 9,
                },
            ],
        };
        assert!((report.sui_spent() - 2.5).abs() < 1e-12);
        assert!((report.wal_spent() - 0.5).abs() < 1e-12);
    }
}
