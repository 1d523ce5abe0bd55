//! Domain types for the Walrus site deployment workflow.
//!
//! These are the types the workflow engine and the cost engine need.
//! Inputs are immutable and built fresh per call; outputs are plain
//! values handed back to the caller and never retained.

use crate::error::DeployError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Number of hex characters in a Sui object ID.
pub const OBJECT_ID_HEX_LEN: usize = 64;

/// Smallest SUI unit per SUI.
pub const MIST_PER_SUI: u64 = 1_000_000_000;

/// Smallest WAL unit per WAL.
pub const FROST_PER_WAL: u64 = 1_000_000_000;

/// Target Sui / Walrus network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
    Devnet,
    Localnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Devnet => "devnet",
            Network::Localnet => "localnet",
        }
    }

    pub fn is_mainnet(&self) -> bool {
        matches!(self, Network::Mainnet)
    }

    /// Default fullnode JSON-RPC endpoint.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://fullnode.mainnet.sui.io:443",
            Network::Testnet => "https://fullnode.testnet.sui.io:443",
            Network::Devnet => "https://fullnode.devnet.sui.io:443",
            Network::Localnet => "http://127.0.0.1:9000",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            "devnet" | "dev" => Ok(Network::Devnet),
            "localnet" | "local" => Ok(Network::Localnet),
            other => Err(DeployError::InvalidInput(format!(
                "unknown network '{}' (expected mainnet, testnet, devnet or localnet)",
                other
            ))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// OBJECT IDS
// ═══════════════════════════════════════════════════════════════════

/// Whether `s` is exactly 64 hex characters, optionally `0x`-prefixed.
pub fn is_valid_object_id(s: &str) -> bool {
    let hex_part = s.strip_prefix("0x").unwrap_or(s);
    hex_part.len() == OBJECT_ID_HEX_LEN && hex_part.bytes().all(|b| b.is_ascii_hexdigit())
}

/// A validated on-chain object ID, stored normalized as `0x` + lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectId(String);

impl ObjectId {
    /// Validate and normalize. Rejects anything but 64 hex chars with optional `0x`.
    pub fn parse(s: &str) -> Result<Self, DeployError> {
        if !is_valid_object_id(s) {
            return Err(DeployError::InvalidInput(format!(
                "invalid object ID '{}': expected 0x followed by {} hex characters",
                s, OBJECT_ID_HEX_LEN
            )));
        }
        let hex_part = s.strip_prefix("0x").unwrap_or(s);
        Ok(Self(format!("0x{}", hex_part.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw 32 bytes of the ID.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        // Validated in `parse`, so decoding cannot fail.
        if let Ok(bytes) = hex::decode(&self.0[2..]) {
            out.copy_from_slice(&bytes);
        }
        out
    }

    /// Base-36 rendering used for subdomain-style portal access.
    pub fn to_base36(&self) -> String {
        const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

        let mut num = self.to_bytes().to_vec();
        let mut start = num.iter().position(|b| *b != 0).unwrap_or(num.len());
        let mut digits = Vec::new();

        while start < num.len() {
            let mut rem: u32 = 0;
            for byte in num[start..].iter_mut() {
                let acc = (rem << 8) | u32::from(*byte);
                *byte = (acc / 36) as u8;
                rem = acc % 36;
            }
            digits.push(ALPHABET[rem as usize]);
            while start < num.len() && num[start] == 0 {
                start += 1;
            }
        }

        if digits.is_empty() {
            return "0".to_string();
        }
        digits.reverse();
        String::from_utf8_lossy(&digits).into_owned()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ObjectId::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════
// COST MODEL
// ═══════════════════════════════════════════════════════════════════

/// Input to the cost engine.
#[derive(Debug, Clone)]
pub struct CostOptions {
    /// Payload size in bytes. Must be > 0.
    pub size_bytes: u64,
    /// Storage duration in epochs. Must be > 0.
    pub epochs: u32,
    /// Number of files; 0 means "estimate from size".
    pub file_count: u64,
    /// Gas price override in MIST per gas unit.
    pub gas_price: Option<u64>,
    pub network: Network,
    /// Path to the `walrus` binary for live pricing.
    pub walrus_bin: Option<PathBuf>,
    pub rpc_url: Option<String>,
}

impl CostOptions {
    pub fn new(size_bytes: u64, epochs: u32, network: Network) -> Self {
        Self {
            size_bytes,
            epochs,
            file_count: 0,
            gas_price: None,
            network,
            walrus_bin: None,
            rpc_url: None,
        }
    }

    pub fn with_file_count(mut self, file_count: u64) -> Self {
        self.file_count = file_count;
        self
    }

    pub fn with_gas_price(mut self, gas_price: u64) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn with_walrus_bin(mut self, path: impl Into<PathBuf>) -> Self {
        self.walrus_bin = Some(path.into());
        self
    }

    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = Some(rpc_url.into());
        self
    }
}

/// Storage network pricing and sizing parameters.
///
/// Lives only for one cost calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageInfo {
    pub current_epoch: u64,
    pub epoch_duration_secs: u64,
    /// FROST per storage unit per epoch.
    pub storage_price_per_unit: u64,
    /// FROST per storage unit, charged once.
    pub write_price_per_unit: u64,
    pub metadata_price: u64,
    pub marginal_price: u64,
    pub max_blob_size: u64,
    pub storage_unit_size: u64,
    pub n_shards: u32,
    pub max_epochs_ahead: u32,
    /// Blow-up factor derived from the network's example blobs, if it reported any.
    pub encoding_multiplier: Option<f64>,
}

/// Where a breakdown's pricing came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingSource {
    /// Parsed from `walrus info --json`.
    Live,
    /// Built-in defaults for the network.
    Default,
}

/// Output of the cost engine. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub gas_units: u64,
    /// MIST per gas unit.
    pub gas_price: u64,
    pub gas_cost_sui: f64,
    pub storage_cost_wal: f64,
    pub write_cost_wal: f64,
    pub total_wal: f64,
    pub encoded_size: u64,
    pub original_size: u64,
    pub file_count: u64,
    pub epochs: u32,
    pub encoding_multiplier: f64,
    pub min_total_wal: f64,
    pub max_total_wal: f64,
    pub min_total_sui: f64,
    pub max_total_sui: f64,
    pub pricing: PricingSource,
}

// ═══════════════════════════════════════════════════════════════════
// OPERATION RESULTS
// ═══════════════════════════════════════════════════════════════════

/// A site resource and the blob that stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub path: String,
    pub blob_id: String,
}

/// Result of any workflow operation. Filled incrementally by the output parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteBuilderOutput {
    /// Site object ID; empty until assigned.
    pub object_id: String,
    pub site_url: String,
    pub browse_urls: Vec<String>,
    pub resources: Vec<Resource>,
    pub base36_id: Option<String>,
    pub success: bool,
}

impl SiteBuilderOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// The object ID, if one was assigned and is well-formed.
    pub fn object_id(&self) -> Option<ObjectId> {
        if self.object_id.is_empty() {
            return None;
        }
        ObjectId::parse(&self.object_id).ok()
    }

    /// Record `id` and derive its base-36 form.
    pub fn set_object_id(&mut self, id: &ObjectId) {
        self.object_id = id.to_string();
        self.base36_id = Some(id.to_base36());
    }
}

/// Workflow operations, for logging and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Deploy,
    Update,
    Destroy,
    Status,
    Estimate,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Deploy => "deploy",
            Operation::Update => "update",
            Operation::Destroy => "destroy",
            Operation::Status => "status",
            Operation::Estimate => "estimate",
        }
    }

    /// Whether the operation changes on-chain state.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Operation::Deploy | Operation::Update | Operation::Destroy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "0x5f1c0b7e0a7d4b1a2c3d4e5f60718293a4b5c6d7e8f90112233445566778899a";

    #[test]
    fn test_object_id_accepts_valid() {
        assert!(is_valid_object_id(ID));
        assert!(is_valid_object_id(&ID[2..]));
        assert!(is_valid_object_id(&ID.to_uppercase().replace("0X", "0x")));
    }

    #[test]
    fn test_object_id_rejects_invalid() {
        assert!(!is_valid_object_id(""));
        assert!(!is_valid_object_id("0x"));
        assert!(!is_valid_object_id(&ID[..65]));
        assert!(!is_valid_object_id(&format!("{}0", ID)));
        assert!(!is_valid_object_id(&ID.replace('a', "g")));
        assert!(!is_valid_object_id(&format!("{}; rm -rf /", &ID[..40])));
        assert!(!is_valid_object_id(&format!("0X{}", &ID[2..])));
    }

    #[test]
    fn test_object_id_normalizes() {
        let id = ObjectId::parse(&ID[2..].to_uppercase()).unwrap();
        assert_eq!(id.as_str(), ID);
    }

    #[test]
    fn test_base36_small_values() {
        let one = ObjectId::parse(&format!("0x{:0>64}", "1")).unwrap();
        assert_eq!(one.to_base36(), "1");

        let thirty_six = ObjectId::parse(&format!("0x{:0>64}", "24")).unwrap();
        assert_eq!(thirty_six.to_base36(), "10");

        let zero = ObjectId::parse(&format!("0x{:0>64}", "0")).unwrap();
        assert_eq!(zero.to_base36(), "0");
    }

    #[test]
    fn test_base36_full_width_is_lowercase_alnum() {
        let id = ObjectId::parse(ID).unwrap();
        let b36 = id.to_base36();
        assert!(!b36.is_empty());
        assert!(b36.len() <= 50);
        assert!(b36.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_operation_mutation() {
        assert!(Operation::Deploy.is_mutating());
        assert!(Operation::Destroy.is_mutating());
        assert!(!Operation::Status.is_mutating());
        assert!(!Operation::Estimate.is_mutating());
        assert_eq!(Operation::Estimate.name(), "estimate");
    }

    #[test]
    fn test_network_parse() {
        assert_eq!("mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("Testnet".parse::<Network>().unwrap(), Network::Testnet);
        assert!("moonnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_output_object_id_helpers() {
        let mut out = SiteBuilderOutput::new();
        assert!(out.object_id().is_none());
        out.set_object_id(&ObjectId::parse(ID).unwrap());
        assert_eq!(out.object_id().unwrap().as_str(), ID);
        assert!(out.base36_id.is_some());
    }
}
