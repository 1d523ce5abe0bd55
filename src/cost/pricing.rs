//! Storage pricing parameters: built-in defaults and the live
//! `walrus info --json` report.

use crate::parser::parse_json_report;
use crate::types::{Network, StorageInfo};
use serde::Deserialize;

const MIB: u64 = 1024 * 1024;

impl StorageInfo {
    /// Published parameters used when the live report is unavailable.
    pub fn default_for(network: Network) -> Self {
        match network {
            Network::Mainnet => Self {
                current_epoch: 0,
                epoch_duration_secs: 14 * 24 * 60 * 60,
                storage_price_per_unit: 100_000,
                write_price_per_unit: 20_000,
                metadata_price: 6_200_000,
                marginal_price: 500_000,
                max_blob_size: 13_958_643_712,
                storage_unit_size: MIB,
                n_shards: 1000,
                max_epochs_ahead: 53,
                encoding_multiplier: None,
            },
            Network::Testnet | Network::Devnet | Network::Localnet => Self {
                current_epoch: 0,
                epoch_duration_secs: 24 * 60 * 60,
                storage_price_per_unit: 50_000,
                write_price_per_unit: 10_000,
                metadata_price: 3_100_000,
                marginal_price: 250_000,
                max_blob_size: 13_958_643_712,
                storage_unit_size: MIB,
                n_shards: 1000,
                max_epochs_ahead: 53,
                encoding_multiplier: None,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InfoReport {
    #[serde(default)]
    epoch_info: Option<EpochInfo>,
    #[serde(default)]
    storage_info: Option<ShardInfo>,
    #[serde(default)]
    size_info: Option<SizeInfo>,
    price_info: PriceInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpochInfo {
    #[serde(default)]
    current_epoch: u64,
    #[serde(default)]
    epoch_duration: Option<EpochDuration>,
    #[serde(default)]
    max_epochs_ahead: Option<u32>,
}

/// Newer CLIs print `{ "secs": .., "nanos": .. }`, older ones milliseconds.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EpochDuration {
    Structured { secs: u64 },
    Millis(u64),
}

impl EpochDuration {
    fn as_secs(&self) -> u64 {
        match self {
            EpochDuration::Structured { secs } => *secs,
            EpochDuration::Millis(ms) => ms / 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShardInfo {
    #[serde(default)]
    n_shards: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SizeInfo {
    #[serde(default)]
    storage_unit_size: Option<u64>,
    #[serde(default)]
    max_blob_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceInfo {
    storage_price_per_unit_size: u64,
    write_price_per_unit_size: u64,
    #[serde(default)]
    encoding_dependent_price_info: Vec<EncodingPriceInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncodingPriceInfo {
    #[serde(default)]
    metadata_price: Option<u64>,
    #[serde(default)]
    marginal_price: Option<u64>,
    #[serde(default)]
    example_blobs: Vec<ExampleBlob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExampleBlob {
    unencoded_size: u64,
    encoded_size: u64,
}

/// Parse a `walrus info --json` report, banner text and color codes included.
///
/// Missing optional sections fall back to `defaults`. The encoding
/// multiplier comes from the example blob closest in size to
/// `payload_size`.
pub fn parse_info_report(
    raw: &str,
    payload_size: u64,
    defaults: &StorageInfo,
) -> Result<StorageInfo, String> {
    let report: InfoReport = parse_json_report(raw)?;

    let mut info = defaults.clone();
    info.storage_price_per_unit = report.price_info.storage_price_per_unit_size;
    info.write_price_per_unit = report.price_info.write_price_per_unit_size;

    if let Some(epoch) = report.epoch_info {
        info.current_epoch = epoch.current_epoch;
        if let Some(d) = epoch.epoch_duration {
            info.epoch_duration_secs = d.as_secs();
        }
        if let Some(max) = epoch.max_epochs_ahead {
            info.max_epochs_ahead = max;
        }
    }
    if let Some(n) = report.storage_info.and_then(|s| s.n_shards) {
        info.n_shards = n;
    }
    if let Some(size) = report.size_info {
        if let Some(unit) = size.storage_unit_size.filter(|u| *u > 0) {
            info.storage_unit_size = unit;
        }
        if let Some(max) = size.max_blob_size {
            info.max_blob_size = max;
        }
    }

    if let Some(enc) = report.price_info.encoding_dependent_price_info.first() {
        if let Some(p) = enc.metadata_price {
            info.metadata_price = p;
        }
        if let Some(p) = enc.marginal_price {
            info.marginal_price = p;
        }
        info.encoding_multiplier = nearest_multiplier(&enc.example_blobs, payload_size);
    }

    if info.storage_price_per_unit == 0 {
        return Err("report has zero storage price".to_string());
    }
    Ok(info)
}

fn nearest_multiplier(blobs: &[ExampleBlob], payload_size: u64) -> Option<f64> {
    let target = (payload_size.max(1) as f64).ln();
    blobs
        .iter()
        .filter(|b| b.unencoded_size > 0 && b.encoded_size >= b.unencoded_size)
        .min_by(|a, b| {
            let da = ((a.unencoded_size as f64).ln() - target).abs();
            let db = ((b.unencoded_size as f64).ln() - target).abs();
            da.total_cmp(&db)
        })
        .map(|b| b.encoded_size as f64 / b.unencoded_size as f64)
        .filter(|m| m.is_finite())
}
