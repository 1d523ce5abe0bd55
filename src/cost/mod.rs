//! Cost estimation for publishing to Walrus.
//!
//! Works offline from built-in pricing; when a `walrus` binary is
//! available the live `walrus info --json` report is used instead. A
//! failed live query is never fatal, it only flips
//! [`CostBreakdown::pricing`] to [`PricingSource::Default`].

pub mod gas;
pub mod pricing;

use crate::backend::{CommandExecutor, CommandSpec};
use crate::error::DeployError;
use crate::types::{CostBreakdown, CostOptions, PricingSource, StorageInfo, FROST_PER_WAL};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub use pricing::parse_info_report;

const MIB: u64 = 1024 * 1024;

/// Average file size assumed when the caller does not know the file count.
pub const AVERAGE_FILE_SIZE: u64 = 50 * 1024;

/// Bound on the live pricing query.
pub const DEFAULT_PRICING_TIMEOUT: Duration = Duration::from_secs(30);

/// Uncertainty bands: storage pricing is stable, gas markets are not.
pub const WAL_MIN_FACTOR: f64 = 0.8;
pub const WAL_MAX_FACTOR: f64 = 1.2;
pub const SUI_MIN_FACTOR: f64 = 0.7;
pub const SUI_MAX_FACTOR: f64 = 1.5;

/// Rough WAL per MiB per epoch used when the engine itself fails.
pub const CRUDE_WAL_PER_MIB_EPOCH: f64 = 0.01;

/// Erasure-coding blow-up by payload size. Larger payloads amortize the
/// fixed per-blob metadata better.
pub fn encoding_multiplier(size_bytes: u64) -> f64 {
    match size_bytes {
        s if s < MIB => 10.0,
        s if s < 16 * MIB => 8.5,
        s if s < 100 * MIB => 6.0,
        s if s < 500 * MIB => 5.0,
        _ => 4.5,
    }
}

/// `floor(size × multiplier(size))`.
pub fn encoded_size(size_bytes: u64) -> u64 {
    encoded_size_with(size_bytes, encoding_multiplier(size_bytes))
}

pub fn encoded_size_with(size_bytes: u64, multiplier: f64) -> u64 {
    (size_bytes as f64 * multiplier).floor() as u64
}

/// `ceil(size / 50 KiB)`, at least 1.
pub fn estimate_file_count(size_bytes: u64) -> u64 {
    size_bytes.div_ceil(AVERAGE_FILE_SIZE).max(1)
}

/// Storage units charged for `encoded` bytes; never less than one.
pub fn storage_units(encoded: u64, unit_size: u64) -> u64 {
    encoded.div_ceil(unit_size.max(1)).max(1)
}

/// Fallback figure when [`calculate_cost`] errors: size in MiB × rate × epochs.
pub fn crude_estimate_wal(size_bytes: u64, epochs: u32) -> f64 {
    (size_bytes as f64 / MIB as f64) * CRUDE_WAL_PER_MIB_EPOCH * f64::from(epochs)
}

fn validate(opts: &CostOptions) -> Result<(), DeployError> {
    if opts.size_bytes == 0 {
        return Err(DeployError::InvalidInput(
            "payload size must be greater than 0".into(),
        ));
    }
    if opts.epochs == 0 {
        return Err(DeployError::InvalidInput(
            "epoch count must be greater than 0".into(),
        ));
    }
    Ok(())
}

/// Pure cost computation.
///
/// `live` is the storage info from the network, if the query succeeded;
/// `None` selects the built-in defaults for `opts.network`.
pub fn calculate_cost(
    opts: &CostOptions,
    live: Option<StorageInfo>,
) -> Result<CostBreakdown, DeployError> {
    validate(opts)?;

    let (info, pricing) = match live {
        Some(info) => (info, PricingSource::Live),
        None => (StorageInfo::default_for(opts.network), PricingSource::Default),
    };

    let file_count = if opts.file_count == 0 {
        estimate_file_count(opts.size_bytes)
    } else {
        opts.file_count
    };

    let multiplier = info
        .encoding_multiplier
        .filter(|m| m.is_finite() && *m >= 1.0)
        .unwrap_or_else(|| encoding_multiplier(opts.size_bytes));
    let encoded = encoded_size_with(opts.size_bytes, multiplier);
    let units = storage_units(encoded, info.storage_unit_size);

    let storage_frost =
        u128::from(units) * u128::from(info.storage_price_per_unit) * u128::from(opts.epochs);
    let write_frost = u128::from(units) * u128::from(info.write_price_per_unit);
    let storage_cost_wal = storage_frost as f64 / FROST_PER_WAL as f64;
    let write_cost_wal = write_frost as f64 / FROST_PER_WAL as f64;
    let total_wal = storage_cost_wal + write_cost_wal;

    let gas_price = gas::resolve_gas_price(opts.gas_price, opts.network);
    let gas_units = gas::estimate_gas_units(file_count);
    let gas_cost_sui = gas::gas_cost_sui(gas_units, gas_price);

    Ok(CostBreakdown {
        gas_units,
        gas_price,
        gas_cost_sui,
        storage_cost_wal,
        write_cost_wal,
        total_wal,
        encoded_size: encoded,
        original_size: opts.size_bytes,
        file_count,
        epochs: opts.epochs,
        encoding_multiplier: multiplier,
        min_total_wal: total_wal * WAL_MIN_FACTOR,
        max_total_wal: total_wal * WAL_MAX_FACTOR,
        min_total_sui: gas_cost_sui * SUI_MIN_FACTOR,
        max_total_sui: gas_cost_sui * SUI_MAX_FACTOR,
        pricing,
    })
}

/// Cost engine with optional live pricing through a `walrus` binary.
pub struct CostEngine<'a, E: CommandExecutor> {
    executor: &'a E,
    pricing_timeout: Duration,
}

impl<'a, E: CommandExecutor> CostEngine<'a, E> {
    pub fn new(executor: &'a E) -> Self {
        Self {
            executor,
            pricing_timeout: DEFAULT_PRICING_TIMEOUT,
        }
    }

    pub fn with_pricing_timeout(mut self, timeout: Duration) -> Self {
        self.pricing_timeout = timeout;
        self
    }

    /// Validate, try live pricing, compute.
    ///
    /// Input errors are returned before any process is spawned. A triggered
    /// `cancel` kills the pricing query and returns `Cancelled`.
    pub async fn calculate(
        &self,
        opts: &CostOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<CostBreakdown, DeployError> {
        validate(opts)?;
        let live = self.query_storage_info(opts, cancel).await?;
        calculate_cost(opts, live)
    }

    /// `Ok(None)` on any failure: no binary configured, spawn error, timeout,
    /// non-zero exit, or an unparseable report. Cancellation is the only error.
    pub async fn query_storage_info(
        &self,
        opts: &CostOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<StorageInfo>, DeployError> {
        let Some(bin) = opts.walrus_bin.as_ref() else {
            return Ok(None);
        };

        let mut spec = CommandSpec::new(bin)
            .args(["info", "--json"])
            .timeout(self.pricing_timeout);
        if let Some(rpc) = &opts.rpc_url {
            spec = spec.args(["--rpc-url", rpc.as_str()]);
        }
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(DeployError::Cancelled {
                tool: spec.tool_name(),
            });
        }

        let output = match self.executor.execute(&spec, cancel).await {
            Ok(o) if o.success() => o,
            Ok(o) => {
                debug!(status = %o.exit_description(), "walrus info failed, using default pricing");
                return Ok(None);
            }
            Err(e @ DeployError::Cancelled { .. }) => return Err(e),
            Err(e) => {
                debug!(error = %e, "walrus info unavailable, using default pricing");
                return Ok(None);
            }
        };

        let defaults = StorageInfo::default_for(opts.network);
        match parse_info_report(&output.stdout, opts.size_bytes, &defaults) {
            Ok(info) => Ok(Some(info)),
            Err(e) => {
                debug!(error = %e, "walrus info report unusable, using default pricing");
                Ok(None)
            }
        }
    }
}
