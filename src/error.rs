//! Error types for the Walrus site deployment workflow.
//!
//! No `anyhow` leakage. Explicit, typed errors.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Rejected before any process was spawned.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{binary} not found on PATH; {hint}")]
    MissingBinary { binary: String, hint: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("network unreachable: {0}")]
    Network(String),

    #[error("{tool} timed out after {}s", .after.as_secs())]
    Timeout { tool: String, after: Duration },

    #[error("{tool} was cancelled")]
    Cancelled { tool: String },

    /// A known failure signature was recognised in stderr.
    #[error("{diagnosis}\n{}", render_steps(.remediation))]
    Classified {
        kind: FailureKind,
        diagnosis: String,
        remediation: Vec<String>,
    },

    #[error("failed to execute {tool}: {message}")]
    Process { tool: String, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rpc error: {0}")]
    Rpc(String),
}

/// Failure families recognised by the error classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transaction confirmation shortfall on the storage network.
    Confirmation,
    /// Not enough SUI for gas or WAL for storage.
    Funds,
    /// Malformed or missing site-builder / walrus configuration.
    Configuration,
    /// Wallet missing or unreadable.
    Wallet,
    /// RPC rate limiting.
    RateLimited,
}

impl FailureKind {
    /// Whether waiting and retrying is the suggested remedy.
    pub fn is_transient(self) -> bool {
        matches!(self, FailureKind::Confirmation | FailureKind::RateLimited)
    }
}

fn render_steps(steps: &[String]) -> String {
    steps
        .iter()
        .enumerate()
        .map(|(i, s)| format!("  {}. {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n")
}

impl DeployError {
    /// Whether this error might be recoverable by retry.
    pub fn is_recoverable(&self) -> bool {
        match self {
            DeployError::Network(_) | DeployError::Rpc(_) | DeployError::Timeout { .. } => true,
            DeployError::Classified { kind, .. } => kind.is_transient(),
            _ => false,
        }
    }

    /// Whether the error was produced by input validation, i.e. nothing ran.
    pub fn is_validation(&self) -> bool {
        matches!(self, DeployError::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DeployError::InvalidInput("epochs must be > 0".to_string());
        assert_eq!(err.to_string(), "invalid input: epochs must be > 0");

        let err = DeployError::Timeout {
            tool: "site-builder".to_string(),
            after: Duration::from_secs(600),
        };
        assert_eq!(err.to_string(), "site-builder timed out after 600s");

        let err = DeployError::Cancelled {
            tool: "site-builder".to_string(),
        };
        assert_eq!(err.to_string(), "site-builder was cancelled");

        let err = DeployError::Process {
            tool: "site-builder".to_string(),
            message: "exit status 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to execute site-builder: exit status 1"
        );

        let err = DeployError::MissingBinary {
            binary: "walrus".to_string(),
            hint: "install it with suiup".to_string(),
        };
        assert!(err.to_string().starts_with("walrus not found on PATH"));
    }

    #[test]
    fn test_classified_display_numbers_steps() {
        let err = DeployError::Classified {
            kind: FailureKind::Funds,
            diagnosis: "not enough SUI".to_string(),
            remediation: vec!["top up".to_string(), "retry".to_string()],
        };
        let text = err.to_string();
        assert!(text.starts_with("not enough SUI"));
        assert!(text.contains("  1. top up"));
        assert!(text.contains("  2. retry"));
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(DeployError::Network("test".to_string()).is_recoverable());
        assert!(DeployError::Rpc("test".to_string()).is_recoverable());
        assert!(DeployError::Timeout {
            tool: "x".into(),
            after: Duration::from_secs(1)
        }
        .is_recoverable());
        assert!(DeployError::Classified {
            kind: FailureKind::RateLimited,
            diagnosis: String::new(),
            remediation: Vec::new(),
        }
        .is_recoverable());

        assert!(!DeployError::InvalidInput("test".to_string()).is_recoverable());
        assert!(!DeployError::Cancelled { tool: "x".into() }.is_recoverable());
        assert!(!DeployError::Classified {
            kind: FailureKind::Funds,
            diagnosis: String::new(),
            remediation: Vec::new(),
        }
        .is_recoverable());
    }
}
