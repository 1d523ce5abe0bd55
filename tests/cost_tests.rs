//! Cost engine properties.

use walrus_deploy_rs::cost::{
    encoded_size, encoding_multiplier, estimate_file_count, parse_info_report, storage_units,
};
use walrus_deploy_rs::{
    calculate_cost, CommandExecutor, CommandOutput, CommandSpec, CostEngine, CostOptions,
    DeployError, Network, PricingSource, StorageInfo,
};
use tokio_util::sync::CancellationToken;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

const SIZES: &[u64] = &[
    1,
    512,
    50 * KIB,
    MIB - 1,
    MIB,
    3 * MIB,
    16 * MIB,
    64 * MIB,
    100 * MIB,
    250 * MIB,
    500 * MIB,
    2048 * MIB,
];

fn testnet(size: u64, epochs: u32) -> CostOptions {
    CostOptions::new(size, epochs, Network::Testnet)
}

#[test]
fn encoded_size_is_floor_of_size_times_multiplier() {
    for &s in SIZES {
        let expected = (s as f64 * encoding_multiplier(s)).floor() as u64;
        assert_eq!(encoded_size(s), expected, "size {}", s);
    }
}

#[test]
fn multiplier_is_non_increasing() {
    for pair in SIZES.windows(2) {
        assert!(
            encoding_multiplier(pair[0]) >= encoding_multiplier(pair[1]),
            "{} vs {}",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn bounds_hold_for_all_sizes() {
    for &s in SIZES {
        for epochs in [1, 5, 53] {
            let b = calculate_cost(&testnet(s, epochs), None).unwrap();
            assert!(b.min_total_wal <= b.total_wal && b.total_wal <= b.max_total_wal);
            assert!(b.min_total_sui <= b.gas_cost_sui && b.gas_cost_sui <= b.max_total_sui);
            assert!((b.total_wal - (b.storage_cost_wal + b.write_cost_wal)).abs() < 1e-12);
        }
    }
}

#[test]
fn band_factors() {
    let b = calculate_cost(&testnet(10 * MIB, 3), None).unwrap();
    assert!((b.min_total_wal - b.total_wal * 0.8).abs() < 1e-12);
    assert!((b.max_total_wal - b.total_wal * 1.2).abs() < 1e-12);
    assert!((b.min_total_sui - b.gas_cost_sui * 0.7).abs() < 1e-12);
    assert!((b.max_total_sui - b.gas_cost_sui * 1.5).abs() < 1e-12);
}

#[test]
fn more_epochs_raise_storage_only() {
    for &s in &[1, 5 * MIB, 200 * MIB] {
        let one = calculate_cost(&testnet(s, 1), None).unwrap();
        let ten = calculate_cost(&testnet(s, 10), None).unwrap();
        assert!(ten.storage_cost_wal > one.storage_cost_wal);
        assert_eq!(ten.write_cost_wal, one.write_cost_wal);
    }
}

#[test]
fn larger_payload_costs_more() {
    // Well separated sizes, each in its own tier.
    let sizes = [KIB, 10 * MIB, 80 * MIB, 400 * MIB, 4096 * MIB];
    for pair in sizes.windows(2) {
        let small = calculate_cost(&testnet(pair[0], 2), None).unwrap();
        let large = calculate_cost(&testnet(pair[1], 2), None).unwrap();
        assert!(large.total_wal > small.total_wal, "{} vs {}", pair[0], pair[1]);
    }
}

#[test]
fn more_files_cost_more_gas() {
    let few = calculate_cost(&testnet(MIB, 1).with_file_count(3), None).unwrap();
    let many = calculate_cost(&testnet(MIB, 1).with_file_count(30), None).unwrap();
    assert!(many.gas_cost_sui > few.gas_cost_sui);
    assert!(many.gas_units > few.gas_units);
}

#[test]
fn mainnet_defaults_not_cheaper_than_testnet() {
    for &s in SIZES {
        let test = calculate_cost(&testnet(s, 4), None).unwrap();
        let main = calculate_cost(&CostOptions::new(s, 4, Network::Mainnet), None).unwrap();
        assert!(main.total_wal >= test.total_wal, "size {}", s);
    }
}

#[test]
fn gas_price_resolution() {
    assert_eq!(calculate_cost(&testnet(MIB, 1), None).unwrap().gas_price, 750);
    let main = CostOptions::new(MIB, 1, Network::Mainnet);
    assert_eq!(calculate_cost(&main, None).unwrap().gas_price, 1000);
    let custom = testnet(MIB, 1).with_gas_price(1234);
    assert_eq!(calculate_cost(&custom, None).unwrap().gas_price, 1234);
}

#[test]
fn invalid_inputs_error() {
    assert!(calculate_cost(&testnet(0, 1), None).unwrap_err().is_validation());
    assert!(calculate_cost(&testnet(1, 0), None).unwrap_err().is_validation());
}

#[test]
fn one_byte_is_charged_one_unit() {
    let b = calculate_cost(&testnet(1, 1), None).unwrap();
    assert!(b.total_wal > 0.0);
    assert_eq!(storage_units(b.encoded_size, MIB), 1);
    assert_eq!(b.file_count, 1);
}

#[test]
fn file_count_estimated_from_size() {
    assert_eq!(estimate_file_count(10 * MIB), 205);
    let b = calculate_cost(&testnet(10 * MIB, 1), None).unwrap();
    assert_eq!(b.file_count, 205);
}

const INFO_REPORT: &str = r#"
2025-01-01T00:00:00Z INFO walrus: connecting to the network
{
  "epochInfo": {"currentEpoch": 42, "epochDuration": {"secs": 86400, "nanos": 0}, "maxEpochsAhead": 53},
  "storageInfo": {"nShards": 1000},
  "sizeInfo": {"storageUnitSize": 1048576, "maxBlobSize": 13958643712},
  "priceInfo": {
    "storagePricePerUnitSize": 11000,
    "writePricePerUnitSize": 20000,
    "encodingDependentPriceInfo": [{
      "marginalSize": 1048576,
      "metadataPrice": 1000,
      "marginalPrice": 2000,
      "exampleBlobs": [
        {"unencodedSize": 16777216, "encodedSize": 83886080, "price": 1, "epochs": 1}
      ]
    }]
  }
}
"#;

#[test]
fn info_report_with_banner_parses() {
    let defaults = StorageInfo::default_for(Network::Testnet);
    let info = parse_info_report(&format!("\x1b[32m{}\x1b[0m", INFO_REPORT), 16 * MIB, &defaults)
        .unwrap();
    assert_eq!(info.current_epoch, 42);
    assert_eq!(info.storage_price_per_unit, 11000);
    assert_eq!(info.write_price_per_unit, 20000);
    assert_eq!(info.encoding_multiplier, Some(5.0));
}

/// Answers `walrus info --json` with a canned report.
struct CannedInfo(Result<&'static str, ()>);

impl CommandExecutor for CannedInfo {
    async fn execute(
        &self,
        _spec: &CommandSpec,
        _cancel: Option<&CancellationToken>,
    ) -> Result<CommandOutput, DeployError> {
        match self.0 {
            Ok(stdout) => Ok(CommandOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                exit_code: Some(0),
            }),
            Err(()) => Err(DeployError::Network("unreachable".into())),
        }
    }
}

#[tokio::test]
async fn engine_uses_live_pricing_when_available() {
    let exec = CannedInfo(Ok(INFO_REPORT));
    let opts = testnet(16 * MIB, 2).with_walrus_bin("/bin/walrus");
    let b = CostEngine::new(&exec).calculate(&opts, None).await.unwrap();
    assert_eq!(b.pricing, PricingSource::Live);
    assert_eq!(b.encoded_size, 80 * MIB);
}

#[tokio::test]
async fn engine_falls_back_silently() {
    for exec in [CannedInfo(Err(())), CannedInfo(Ok("garbage output"))] {
        let opts = testnet(MIB, 2).with_walrus_bin("/bin/walrus");
        let b = CostEngine::new(&exec).calculate(&opts, None).await.unwrap();
        assert_eq!(b.pricing, PricingSource::Default);
    }
}

#[tokio::test]
async fn engine_without_binary_uses_defaults() {
    let exec = CannedInfo(Ok(INFO_REPORT));
    let b = CostEngine::new(&exec).calculate(&testnet(MIB, 1), None).await.unwrap();
    assert_eq!(b.pricing, PricingSource::Default);
}

/// Answers the way the runner does once the token fires mid-query.
struct KilledByCancel;

impl CommandExecutor for KilledByCancel {
    async fn execute(
        &self,
        spec: &CommandSpec,
        _cancel: Option<&CancellationToken>,
    ) -> Result<CommandOutput, DeployError> {
        Err(DeployError::Cancelled {
            tool: spec.tool_name(),
        })
    }
}

#[tokio::test]
async fn engine_propagates_cancellation_instead_of_falling_back() {
    let opts = testnet(MIB, 2).with_walrus_bin("/bin/walrus");
    let err = CostEngine::new(&KilledByCancel)
        .calculate(&opts, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Cancelled { .. }));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let exec = CannedInfo(Ok(INFO_REPORT));
    let err = CostEngine::new(&exec)
        .calculate(&opts, Some(&cancel))
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Cancelled { ref tool } if tool == "walrus"));
}
