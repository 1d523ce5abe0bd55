//! Gas model for publishing a site.
//!
//! Every file becomes a blob registration plus a resource on the site
//! object, so gas scales with the file count on top of a fixed cost for
//! creating the site object itself.

use crate::types::{Network, MIST_PER_SUI};

/// Site object creation, metadata and routes.
pub const BASE_GAS_UNITS: u64 = 50_000;

/// Blob registration and resource insertion per file.
pub const GAS_UNITS_PER_FILE: u64 = 10_000;

/// MIST per gas unit on mainnet.
pub const MAINNET_GAS_PRICE: u64 = 1000;

/// MIST per gas unit on test networks.
pub const TESTNET_GAS_PRICE: u64 = 750;

pub fn default_gas_price(network: Network) -> u64 {
    if network.is_mainnet() {
        MAINNET_GAS_PRICE
    } else {
        TESTNET_GAS_PRICE
    }
}

/// Override first, then the network default.
pub fn resolve_gas_price(override_price: Option<u64>, network: Network) -> u64 {
    override_price
        .filter(|p| *p > 0)
        .unwrap_or_else(|| default_gas_price(network))
}

pub fn estimate_gas_units(file_count: u64) -> u64 {
    BASE_GAS_UNITS.saturating_add(GAS_UNITS_PER_FILE.saturating_mul(file_count))
}

/// Gas units × price, in SUI.
pub fn gas_cost_sui(gas_units: u64, gas_price: u64) -> f64 {
    let mist = u128::from(gas_units) * u128::from(gas_price);
    mist as f64 / MIST_PER_SUI as f64
}
