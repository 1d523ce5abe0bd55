//! Walrus Deploy Library
//!
//! Deployment workflow and cost estimation for publishing static sites to
//! Walrus with the `site-builder` and `walrus` command-line tools.
//!
//! # Design
//!
//! The library never talks to the storage network itself. Every external
//! effect is a child process run through the [`CommandExecutor`] trait;
//! [`ProcessRunner`] is the real implementation, and tests plug in their
//! own. The workflow engine validates input, checks the environment, runs
//! exactly one deployer process per operation and parses what it printed.
//!
//! # Usage
//!
//! ```ignore
//! use walrus_deploy_rs::{ProcessRunner, SiteWorkflow, WorkflowConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let runner = ProcessRunner::new();
//! let config = WorkflowConfig::from_env()?;
//! let workflow = SiteWorkflow::new(&runner, config);
//!
//! // Cost first, no deployer involved
//! let cost = workflow.estimate("dist".as_ref(), 5).await?;
//! println!("~{:.4} WAL", cost.total_wal);
//!
//! // Publish; cancel() kills the deployer
//! let cancel = CancellationToken::new();
//! let site = workflow.deploy("dist".as_ref(), 5, Some(&cancel)).await?;
//! println!("site object: {}", site.object_id);
//! ```

pub mod backend;
pub mod classify;
pub mod config;
pub mod cost;
pub mod display;
pub mod error;
pub mod parser;
pub mod preflight;
pub mod runner;
pub mod types;
pub mod walk;
pub mod workflow;

#[cfg(feature = "rpc-client")]
pub mod rpc;

// Re-export the main types at crate root for convenience
pub use backend::{CommandExecutor, CommandOutput, CommandSpec, DEFAULT_TIMEOUT};
pub use classify::classify_failure;
pub use config::WorkflowConfig;
pub use cost::{calculate_cost, crude_estimate_wal, encoded_size, encoding_multiplier, CostEngine};
pub use error::{DeployError, FailureKind};
pub use parser::{extract_json, strip_ansi, OutputParser, TextOutputParser};
pub use preflight::{resolve_binary, Preflight, PreflightReport};
pub use runner::ProcessRunner;
pub use types::*;
pub use walk::{walk_site_dir, SiteStats};
pub use workflow::SiteWorkflow;

#[cfg(feature = "rpc-client")]
pub use rpc::{CoinSpend, SpendReport, SuiRpcClient};
