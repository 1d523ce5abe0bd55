//! Preflight checks run once before every mutating operation.
//!
//! Order matters and the first hard failure wins: storage CLI present,
//! storage network reachable, deployer present, wallet funded. An empty
//! wallet is only a warning; the chain will refuse with a clearer error.

use crate::backend::{CommandExecutor, CommandSpec};
use crate::config::WorkflowConfig;
use crate::error::DeployError;
use crate::parser::parse_json_report;
use crate::types::MIST_PER_SUI;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// What preflight found.
#[derive(Debug, Clone, PartialEq)]
pub struct PreflightReport {
    pub walrus_path: PathBuf,
    pub site_builder_path: PathBuf,
    /// Total gas-coin balance in MIST, if the wallet could be queried.
    pub balance_mist: Option<u64>,
    pub warnings: Vec<String>,
}

impl PreflightReport {
    pub fn balance_sui(&self) -> Option<f64> {
        self.balance_mist
            .map(|mist| mist as f64 / MIST_PER_SUI as f64)
    }
}

/// Resolve a binary name against `PATH`, or check an explicit path.
///
/// Never cached: a binary installed mid-session is found on the next call.
pub fn resolve_binary(name_or_path: &str) -> Result<PathBuf, DeployError> {
    let candidate = Path::new(name_or_path);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        if candidate.is_file() {
            return Ok(candidate.to_path_buf());
        }
        return Err(missing(name_or_path));
    }
    which::which(name_or_path).map_err(|_| missing(name_or_path))
}

fn missing(binary: &str) -> DeployError {
    let tool = Path::new(binary)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| binary.to_string());
    let hint = match tool.as_str() {
        "walrus" => "install the Walrus CLI (e.g. `suiup install walrus`) and make sure it is on PATH",
        "site-builder" => "install the Walrus site-builder (e.g. `suiup install site-builder`) and make sure it is on PATH",
        "sui" => "install the Sui CLI (e.g. `suiup install sui`) and make sure it is on PATH",
        _ => "install it or set its path in the WALRUS_DEPLOY_* environment",
    };
    DeployError::MissingBinary {
        binary: binary.to_string(),
        hint: hint.to_string(),
    }
}

/// Default location of the site-builder configuration.
pub fn default_sites_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("walrus").join("sites-config.yaml"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GasCoin {
    #[serde(default)]
    mist_balance: u64,
}

/// Sum `mistBalance` over `sui client gas --json` output.
pub fn parse_gas_coins(raw: &str) -> Result<u64, String> {
    let coins: Vec<GasCoin> = parse_json_report(raw)?;
    Ok(coins.iter().map(|c| c.mist_balance).sum())
}

pub struct Preflight<'a, E: CommandExecutor> {
    executor: &'a E,
    config: &'a WorkflowConfig,
}

impl<'a, E: CommandExecutor> Preflight<'a, E> {
    pub fn new(executor: &'a E, config: &'a WorkflowConfig) -> Self {
        Self { executor, config }
    }

    pub async fn run(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<PreflightReport, DeployError> {
        let mut warnings = Vec::new();

        let walrus_path = resolve_binary(&self.config.walrus_bin)?;
        self.check_reachable(&walrus_path, cancel).await?;
        let site_builder_path = resolve_binary(&self.config.site_builder_bin)?;
        self.check_config(&mut warnings)?;

        let balance_mist = match self.wallet_balance(cancel).await {
            Ok(mist) => {
                if mist == 0 {
                    warnings.push(
                        "active wallet has no SUI; the transaction will likely fail for gas"
                            .to_string(),
                    );
                }
                Some(mist)
            }
            Err(DeployError::Cancelled { tool }) => return Err(DeployError::Cancelled { tool }),
            Err(e) => {
                warnings.push(format!("could not check wallet balance: {}", e));
                None
            }
        };

        for w in &warnings {
            warn!("{}", w);
        }

        Ok(PreflightReport {
            walrus_path,
            site_builder_path,
            balance_mist,
            warnings,
        })
    }

    async fn check_reachable(
        &self,
        walrus: &Path,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), DeployError> {
        let mut spec = CommandSpec::new(walrus)
            .args(["info", "--json"])
            .timeout(self.config.preflight_timeout);
        if let Some(rpc) = &self.config.rpc_url {
            spec = spec.args(["--rpc-url", rpc.as_str()]);
        }

        let output = match self.executor.execute(&spec, cancel).await {
            Ok(o) => o,
            Err(DeployError::Timeout { after, .. }) => {
                return Err(DeployError::Network(format!(
                    "walrus did not answer within {}s; check your connection and RPC endpoint",
                    after.as_secs()
                )))
            }
            Err(e) => return Err(e),
        };

        if !output.success() {
            debug!(stderr = %output.stderr, "walrus info failed");
            let detail = output
                .stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("no error output");
            return Err(DeployError::Network(format!(
                "cannot reach the Walrus {} network ({}): {}",
                self.config.network,
                output.exit_description(),
                detail.trim()
            )));
        }
        Ok(())
    }

    fn check_config(&self, warnings: &mut Vec<String>) -> Result<(), DeployError> {
        match &self.config.site_builder_config {
            Some(path) => {
                if !path.is_file() {
                    return Err(DeployError::Config(format!(
                        "site-builder config {} does not exist or is not a file",
                        path.display()
                    )));
                }
                std::fs::File::open(path).map_err(|e| {
                    DeployError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
            }
            None => {
                if let Some(default) = default_sites_config_path().filter(|p| !p.exists()) {
                    warnings.push(format!(
                        "no site-builder config at {}; site-builder will use its own search path",
                        default.display()
                    ));
                }
            }
        }
        Ok(())
    }

    async fn wallet_balance(&self, cancel: Option<&CancellationToken>) -> Result<u64, DeployError> {
        let sui = resolve_binary(&self.config.sui_bin)?;
        let spec = CommandSpec::new(sui)
            .args(["client", "gas", "--json"])
            .timeout(self.config.preflight_timeout);
        let output = self.executor.execute(&spec, cancel).await?;
        if !output.success() {
            return Err(DeployError::Process {
                tool: "sui".to_string(),
                message: output.exit_description(),
            });
        }
        parse_gas_coins(&output.stdout).map_err(DeployError::Parse)
    }
}
