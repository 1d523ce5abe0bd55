//! Workflow configuration.
//!
//! Defaults cover the common case; `from_env` overlays `WALRUS_DEPLOY_*`
//! variables. Binary names are stored, never resolved paths, so every
//! call re-resolves them against `PATH`.

use crate::error::DeployError;
use crate::types::Network;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Workflow configuration.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub network: Network,
    /// Name or path of the site deployer.
    pub site_builder_bin: String,
    /// Name or path of the storage network CLI.
    pub walrus_bin: String,
    /// Name or path of the Sui CLI (wallet balance only).
    pub sui_bin: String,
    /// Explicit `sites-config.yaml`, passed through as `--config`.
    pub site_builder_config: Option<PathBuf>,
    pub rpc_url: Option<String>,
    /// Gas price override in MIST.
    pub gas_price: Option<u64>,
    /// Ceiling for publish / update / destroy.
    pub deploy_timeout: Duration,
    /// Ceiling for the read-only sitemap query.
    pub status_timeout: Duration,
    /// Ceiling for reachability and wallet probes.
    pub preflight_timeout: Duration,
    /// Ceiling for the live pricing query.
    pub pricing_timeout: Duration,
    /// Mirror child output to the terminal.
    pub stream_output: bool,
    /// Download ceiling for theme assets, read by presentation collaborators.
    pub theme_timeout: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            site_builder_bin: "site-builder".to_string(),
            walrus_bin: "walrus".to_string(),
            sui_bin: "sui".to_string(),
            site_builder_config: None,
            rpc_url: None,
            gas_price: None,
            deploy_timeout: Duration::from_secs(10 * 60),
            status_timeout: Duration::from_secs(2 * 60),
            preflight_timeout: Duration::from_secs(30),
            pricing_timeout: Duration::from_secs(30),
            stream_output: true,
            theme_timeout: Duration::from_secs(60),
        }
    }
}

impl WorkflowConfig {
    /// Defaults overlaid with `WALRUS_DEPLOY_*` environment variables.
    pub fn from_env() -> Result<Self, DeployError> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup` (an environment or a test map).
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self, DeployError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("WALRUS_DEPLOY_NETWORK") {
            self.network = Network::from_str(&v)
                .map_err(|e| DeployError::Config(format!("WALRUS_DEPLOY_NETWORK: {}", e)))?;
        }
        if let Some(v) = get("WALRUS_DEPLOY_SITE_BUILDER_BIN") {
            self.site_builder_bin = v;
        }
        if let Some(v) = get("WALRUS_DEPLOY_WALRUS_BIN") {
            self.walrus_bin = v;
        }
        if let Some(v) = get("WALRUS_DEPLOY_SUI_BIN") {
            self.sui_bin = v;
        }
        if let Some(v) = get("WALRUS_DEPLOY_CONFIG") {
            self.site_builder_config = Some(PathBuf::from(v));
        }
        if let Some(v) = get("WALRUS_DEPLOY_RPC_URL") {
            self.rpc_url = Some(v);
        }
        if let Some(v) = get("WALRUS_DEPLOY_GAS_PRICE") {
            self.gas_price = Some(parse_u64("WALRUS_DEPLOY_GAS_PRICE", &v)?);
        }
        if let Some(v) = get("WALRUS_DEPLOY_TIMEOUT_SECS") {
            self.deploy_timeout = Duration::from_secs(parse_u64("WALRUS_DEPLOY_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = get("WALRUS_DEPLOY_STATUS_TIMEOUT_SECS") {
            self.status_timeout =
                Duration::from_secs(parse_u64("WALRUS_DEPLOY_STATUS_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = get("WALRUS_DEPLOY_THEME_TIMEOUT") {
            self.theme_timeout = Duration::from_secs(parse_u64("WALRUS_DEPLOY_THEME_TIMEOUT", &v)?);
        }
        if let Some(v) = get("WALRUS_DEPLOY_STREAM") {
            self.stream_output = !matches!(v.trim(), "0" | "false" | "no" | "off");
        }

        Ok(self)
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    /// Arguments every `site-builder` invocation starts with.
    pub fn site_builder_global_args(&self, walrus_path: Option<&std::path::Path>) -> Vec<String> {
        let mut args = vec!["--context".to_string(), self.network.to_string()];
        if let Some(cfg) = &self.site_builder_config {
            args.push("--config".to_string());
            args.push(cfg.display().to_string());
        }
        if let Some(path) = walrus_path {
            args.push("--walrus-binary".to_string());
            args.push(path.display().to_string());
        }
        if let Some(rpc) = &self.rpc_url {
            args.push("--rpc-url".to_string());
            args.push(rpc.clone());
        }
        args
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, DeployError> {
    value
        .trim()
        .parse()
        .map_err(|_| DeployError::Config(format!("{} must be a non-negative integer, got '{}'", key, value)))
}
