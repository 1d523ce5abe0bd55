//! Human-readable progress output.
//!
//! Everything printed here is for interactive use only; the structured
//! results returned by the workflow carry the same information.
//!
//! Process-wide state: a single verbosity flag, read-mostly, default off.
//! No teardown is needed.

use crate::backend::{CommandOutput, CommandSpec};
use crate::types::{CostBreakdown, Network, PricingSource, Resource, SiteBuilderOutput};
use crate::walk::SiteStats;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// ASCII icons when `WALRUS_DEPLOY_ASCII` is set or `NO_COLOR` is present.
pub fn use_ascii() -> bool {
    let forced = std::env::var("WALRUS_DEPLOY_ASCII")
        .map(|v| !matches!(v.as_str(), "" | "0" | "false"))
        .unwrap_or(false);
    forced || std::env::var_os("NO_COLOR").is_some()
}

#[derive(Debug, Clone, Copy)]
pub enum Icon {
    Ok,
    Warn,
    Info,
    Cost,
    Rocket,
}

impl Icon {
    pub fn render(self, ascii: bool) -> &'static str {
        match (self, ascii) {
            (Icon::Ok, false) => "✅",
            (Icon::Ok, true) => "[ok]",
            (Icon::Warn, false) => "⚠️ ",
            (Icon::Warn, true) => "[!]",
            (Icon::Info, false) => "📁",
            (Icon::Info, true) => "[i]",
            (Icon::Cost, false) => "💰",
            (Icon::Cost, true) => "[$]",
            (Icon::Rocket, false) => "🚀",
            (Icon::Rocket, true) => "[>]",
        }
    }
}

fn icon(i: Icon) -> &'static str {
    i.render(use_ascii())
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

pub fn print_site_stats(dir: &Path, stats: &SiteStats) {
    println!(
        "{} Analyzing {}: {} files, {}",
        icon(Icon::Info),
        dir.display(),
        stats.file_count,
        format_bytes(stats.total_bytes)
    );
    for w in &stats.warnings {
        println!("{} {}", icon(Icon::Warn), w);
    }
}

pub fn format_cost_breakdown(b: &CostBreakdown) -> String {
    let mut s = String::new();
    let source = match b.pricing {
        PricingSource::Live => "live network pricing",
        PricingSource::Default => "default pricing",
    };
    let _ = writeln!(s, "Estimated cost ({}):", source);
    let _ = writeln!(
        s,
        "  Size:      {} -> {} encoded ({:.1}x), {} files",
        format_bytes(b.original_size),
        format_bytes(b.encoded_size),
        b.encoding_multiplier,
        b.file_count
    );
    let _ = writeln!(s, "  Epochs:    {}", b.epochs);
    let _ = writeln!(s, "  Storage:   {:.6} WAL", b.storage_cost_wal);
    let _ = writeln!(s, "  Write:     {:.6} WAL", b.write_cost_wal);
    let _ = writeln!(
        s,
        "  Total:     {:.6} WAL  (range {:.6} - {:.6})",
        b.total_wal, b.min_total_wal, b.max_total_wal
    );
    let _ = writeln!(
        s,
        "  Gas:       {:.6} SUI  (range {:.6} - {:.6}; {} units @ {} MIST)",
        b.gas_cost_sui, b.min_total_sui, b.max_total_sui, b.gas_units, b.gas_price
    );
    s
}

pub fn print_cost_breakdown(b: &CostBreakdown) {
    println!("{} {}", icon(Icon::Cost), format_cost_breakdown(b).trim_end());
}

pub fn print_crude_estimate(total_wal: f64) {
    println!(
        "{} Rough estimate: ~{:.4} WAL (detailed estimate unavailable)",
        icon(Icon::Cost),
        total_wal
    );
}

pub fn print_executing(spec: &CommandSpec) {
    println!("{} Running: {}", icon(Icon::Rocket), spec.command_line());
}

pub fn print_warning(msg: &str) {
    println!("{} {}", icon(Icon::Warn), msg);
}

/// What to do after a successful deploy.
pub fn format_next_steps(output: &SiteBuilderOutput, network: Network) -> Option<String> {
    let id = output.object_id()?;
    let mut s = String::new();
    let _ = writeln!(s, "Next steps:");
    let _ = writeln!(s, "  1. Persist the site object ID in ws-resources.json:");
    let _ = writeln!(s, "       \"object_id\": \"{}\"", id);
    let _ = writeln!(s, "  2. Publish changes with:");
    let _ = writeln!(s, "       walrus-deploy update <dir> {} --network {}", id, network);
    let _ = writeln!(s, "  3. Check what is stored with:");
    let _ = writeln!(s, "       walrus-deploy status {} --network {}", id, network);
    if let Some(b36) = &output.base36_id {
        if network.is_mainnet() {
            let _ = writeln!(s, "  Portal: https://{}.wal.app", b36);
        } else {
            let _ = writeln!(s, "  Base36 ID (for a local portal): {}", b36);
        }
    }
    Some(s)
}

pub fn print_success(output: &SiteBuilderOutput, network: Network) {
    println!("{} Done.", icon(Icon::Ok));
    if !output.site_url.is_empty() {
        println!("   Site: {}", output.site_url);
    }
    if let Some(steps) = format_next_steps(output, network) {
        println!("{}", steps.trim_end());
    }
}

pub fn format_resources(resources: &[Resource]) -> String {
    if resources.is_empty() {
        return "No resources found.\n".to_string();
    }
    let width = resources.iter().map(|r| r.path.len()).max().unwrap_or(0);
    let mut s = String::new();
    for r in resources {
        let _ = writeln!(s, "  {:<width$}  {}", r.path, r.blob_id, width = width);
    }
    s
}

pub fn print_resources(object_id: &str, resources: &[Resource]) {
    println!(
        "{} Site {} ({} resources)",
        icon(Icon::Info),
        object_id,
        resources.len()
    );
    print!("{}", format_resources(resources));
}

/// Everything needed to re-run the failed command by hand.
pub fn format_failure_diagnostics(
    spec: &CommandSpec,
    binaries: &[(&str, &Path)],
    output: Option<&CommandOutput>,
) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "Command: {}", spec.command_line());
    for (name, path) in binaries {
        let _ = writeln!(s, "{}: {}", name, path.display());
    }
    if let Some(out) = output {
        let _ = writeln!(s, "Exit: {}", out.exit_description());
        let _ = writeln!(s, "--- stdout ---\n{}", out.stdout.trim_end());
        let _ = writeln!(s, "--- stderr ---\n{}", out.stderr.trim_end());
    }
    s
}

pub fn print_failure_diagnostics(
    spec: &CommandSpec,
    binaries: &[(&str, &Path)],
    output: Option<&CommandOutput>,
) {
    eprintln!(
        "{} {}",
        icon(Icon::Warn),
        format_failure_diagnostics(spec, binaries, output).trim_end()
    );
}
