//! Site Workflow Engine
//!
//! Drives one `site-builder` invocation per operation. Every operation is
//! a single pass: validate, check the environment, run the child, parse.
//! There is no state carried between calls. All effects go through the
//! [`CommandExecutor`] you provide.

use crate::backend::{CommandExecutor, CommandOutput, CommandSpec};
use crate::classify::classify_failure;
use crate::config::WorkflowConfig;
use crate::cost::{calculate_cost, crude_estimate_wal, CostEngine};
use crate::display;
use crate::error::DeployError;
use crate::parser::{parse_resources, strip_ansi, OutputParser, TextOutputParser};
use crate::preflight::{resolve_binary, Preflight, PreflightReport};
use crate::types::{CostBreakdown, CostOptions, ObjectId, Operation, SiteBuilderOutput};
use crate::walk::{walk_site_dir, SiteStats};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The site workflow engine.
///
/// Parameterized by the executor. Use [`crate::runner::ProcessRunner`] for
/// real processes, or your own implementation in tests.
pub struct SiteWorkflow<'a, E: CommandExecutor> {
    executor: &'a E,
    config: WorkflowConfig,
    parser: Box<dyn OutputParser>,
}

impl<'a, E: CommandExecutor> SiteWorkflow<'a, E> {
    pub fn new(executor: &'a E, config: WorkflowConfig) -> Self {
        Self {
            executor,
            config,
            parser: Box::new(TextOutputParser),
        }
    }

    /// Replace the deployer output parser.
    pub fn with_parser(mut self, parser: Box<dyn OutputParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════════
    // OPERATIONS
    // ═══════════════════════════════════════════════════════════════

    /// Publish a new site from `dir`.
    pub async fn deploy(
        &self,
        dir: &Path,
        epochs: u32,
        cancel: Option<&CancellationToken>,
    ) -> Result<SiteBuilderOutput, DeployError> {
        validate_epochs(epochs)?;
        validate_dir(dir)?;
        info!(dir = %dir.display(), epochs, network = %self.config.network, "deploy");

        let stats = self.analyze(dir);
        match self.cost_for(&stats, epochs, cancel).await {
            Ok(breakdown) => display::print_cost_breakdown(&breakdown),
            Err(e @ DeployError::Cancelled { .. }) => return Err(e),
            Err(e) => {
                debug!(error = %e, "cost engine failed, showing rough estimate");
                display::print_crude_estimate(crude_estimate_wal(stats.total_bytes, epochs));
            }
        }

        let report = self.preflight(cancel).await?;
        let args = vec![
            "publish".to_string(),
            "--epochs".to_string(),
            epochs.to_string(),
            dir.display().to_string(),
        ];
        let output = self
            .run_site_builder(Operation::Deploy, &report, args, self.config.deploy_timeout, cancel)
            .await?;

        let mut result = self.parser.parse(&output.combined());
        result.success = true;
        self.add_portal_url(&mut result);
        if result.object_id().is_none() {
            warn!("deploy succeeded but no site object ID was found in the output");
        }
        display::print_success(&result, self.config.network);
        Ok(result)
    }

    /// Publish `dir` over an existing site.
    ///
    /// The returned object ID is always `object_id`; update output may omit it.
    pub async fn update(
        &self,
        dir: &Path,
        object_id: &str,
        epochs: u32,
        cancel: Option<&CancellationToken>,
    ) -> Result<SiteBuilderOutput, DeployError> {
        let id = ObjectId::parse(object_id)?;
        validate_epochs(epochs)?;
        validate_dir(dir)?;
        info!(dir = %dir.display(), object_id = %id, epochs, "update");

        let stats = self.analyze(dir);
        match self.cost_for(&stats, epochs, cancel).await {
            Ok(breakdown) => display::print_cost_breakdown(&breakdown),
            Err(e @ DeployError::Cancelled { .. }) => return Err(e),
            Err(e) => debug!(error = %e, "no cost estimate for update"),
        }

        let report = self.preflight(cancel).await?;
        let args = vec![
            "update".to_string(),
            "--epochs".to_string(),
            epochs.to_string(),
            dir.display().to_string(),
            id.to_string(),
        ];
        let output = self
            .run_site_builder(Operation::Update, &report, args, self.config.deploy_timeout, cancel)
            .await?;

        let mut result = self.parser.parse(&output.combined());
        result.set_object_id(&id);
        result.success = true;
        self.add_portal_url(&mut result);
        display::print_success(&result, self.config.network);
        Ok(result)
    }

    /// Remove a site and its resources.
    ///
    /// Cancelling `cancel` kills the deployer before this returns.
    pub async fn destroy(
        &self,
        object_id: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<SiteBuilderOutput, DeployError> {
        let id = ObjectId::parse(object_id)?;
        info!(object_id = %id, "destroy");

        let report = self.preflight(cancel).await?;
        let args = vec!["destroy".to_string(), id.to_string()];
        self.run_site_builder(Operation::Destroy, &report, args, self.config.deploy_timeout, cancel)
            .await?;

        let mut result = SiteBuilderOutput::new();
        result.set_object_id(&id);
        result.success = true;
        display::print_success(&result, self.config.network);
        Ok(result)
    }

    /// List the resources of a deployed site. Read-only; no preflight.
    pub async fn status(
        &self,
        object_id: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<SiteBuilderOutput, DeployError> {
        let id = ObjectId::parse(object_id)?;
        info!(object_id = %id, "status");

        let site_builder = resolve_binary(&self.config.site_builder_bin)?;
        let walrus = resolve_binary(&self.config.walrus_bin).ok();
        let mut spec = CommandSpec::new(&site_builder)
            .args(self.config.site_builder_global_args(walrus.as_deref()))
            .args(["sitemap", id.as_str()])
            .timeout(self.config.status_timeout)
            .streaming(false);
        if display::is_verbose() {
            spec = spec.streaming(true);
        }

        let mut binaries = vec![("site-builder", site_builder.as_path())];
        if let Some(w) = walrus.as_deref() {
            binaries.push(("walrus", w));
        }
        let output = self.execute_checked(&spec, &binaries, cancel).await?;

        let mut result = SiteBuilderOutput::new();
        result.resources = parse_resources(&strip_ansi(&output.combined()));
        result.set_object_id(&id);
        result.success = true;
        display::print_resources(id.as_str(), &result.resources);
        Ok(result)
    }

    /// Cost of publishing `dir` for `epochs`, without deploying.
    pub async fn estimate(&self, dir: &Path, epochs: u32) -> Result<CostBreakdown, DeployError> {
        validate_epochs(epochs)?;
        validate_dir(dir)?;
        info!(operation = Operation::Estimate.name(), dir = %dir.display(), epochs, "estimate");

        let stats = self.analyze(dir);
        let breakdown = self.cost_for(&stats, epochs, None).await?;
        display::print_cost_breakdown(&breakdown);
        Ok(breakdown)
    }

    // ═══════════════════════════════════════════════════════════════
    // HELPERS
    // ═══════════════════════════════════════════════════════════════

    fn analyze(&self, dir: &Path) -> SiteStats {
        let stats = walk_site_dir(dir);
        display::print_site_stats(dir, &stats);
        stats
    }

    async fn cost_for(
        &self,
        stats: &SiteStats,
        epochs: u32,
        cancel: Option<&CancellationToken>,
    ) -> Result<CostBreakdown, DeployError> {
        let mut opts = CostOptions::new(stats.total_bytes, epochs, self.config.network)
            .with_file_count(stats.file_count);
        if let Some(price) = self.config.gas_price {
            opts = opts.with_gas_price(price);
        }
        if let Some(rpc) = &self.config.rpc_url {
            opts = opts.with_rpc_url(rpc.clone());
        }

        match resolve_binary(&self.config.walrus_bin) {
            Ok(walrus) => {
                CostEngine::new(self.executor)
                    .with_pricing_timeout(self.config.pricing_timeout)
                    .calculate(&opts.with_walrus_bin(walrus), cancel)
                    .await
            }
            Err(_) => calculate_cost(&opts, None),
        }
    }

    async fn preflight(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<PreflightReport, DeployError> {
        let report = Preflight::new(self.executor, &self.config).run(cancel).await?;
        for w in &report.warnings {
            display::print_warning(w);
        }
        Ok(report)
    }

    async fn run_site_builder(
        &self,
        op: Operation,
        report: &PreflightReport,
        sub_args: Vec<String>,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<CommandOutput, DeployError> {
        let spec = CommandSpec::new(&report.site_builder_path)
            .args(self.config.site_builder_global_args(Some(report.walrus_path.as_path())))
            .args(sub_args)
            .timeout(timeout)
            .streaming(self.config.stream_output);
        debug!(operation = op.name(), mutating = op.is_mutating(), "running site-builder");

        let binaries = [
            ("site-builder", report.site_builder_path.as_path()),
            ("walrus", report.walrus_path.as_path()),
        ];
        self.execute_checked(&spec, &binaries, cancel).await
    }

    /// Execute and turn a non-zero exit into a classified error.
    async fn execute_checked(
        &self,
        spec: &CommandSpec,
        binaries: &[(&str, &Path)],
        cancel: Option<&CancellationToken>,
    ) -> Result<CommandOutput, DeployError> {
        display::print_executing(spec);

        let output = match self.executor.execute(spec, cancel).await {
            Ok(o) => o,
            Err(e) => {
                if !e.is_validation() {
                    display::print_failure_diagnostics(spec, binaries, None);
                }
                return Err(e);
            }
        };

        if !output.success() {
            display::print_failure_diagnostics(spec, binaries, Some(&output));
            let err = classify_failure(
                &spec.tool_name(),
                &output.exit_description(),
                &strip_ansi(&output.stderr),
            );
            warn!(error = %err, "site-builder failed");
            return Err(err);
        }
        Ok(output)
    }

    /// Mainnet sites are served by the public portal under their base-36 ID.
    fn add_portal_url(&self, result: &mut SiteBuilderOutput) {
        if !self.config.network.is_mainnet() {
            return;
        }
        let Some(b36) = result.base36_id.clone() else {
            return;
        };
        let url = portal_url(&b36);
        if !result.browse_urls.contains(&url) {
            result.browse_urls.push(url.clone());
        }
        if result.site_url.is_empty() {
            result.site_url = url;
        }
    }
}

/// `https://<base36>.wal.app`
pub fn portal_url(base36_id: &str) -> String {
    format!("https://{}.wal.app", base36_id)
}

fn validate_epochs(epochs: u32) -> Result<(), DeployError> {
    if epochs == 0 {
        return Err(DeployError::InvalidInput(
            "epochs must be greater than 0".into(),
        ));
    }
    Ok(())
}

fn validate_dir(dir: &Path) -> Result<(), DeployError> {
    if !dir.is_dir() {
        return Err(DeployError::InvalidInput(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    Ok(())
}
