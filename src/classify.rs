//! Failure classification for deployer stderr.
//!
//! Known signatures are matched in order; the first hit wins and is
//! rewritten into a diagnosis with concrete remediation steps. Nothing
//! here retries.

use crate::error::{DeployError, FailureKind};
use tracing::debug;

struct Signature {
    kind: FailureKind,
    /// Lowercase substrings; any one matching selects this signature.
    needles: &'static [&'static str],
    diagnosis: &'static str,
    remediation: &'static [&'static str],
}

const SIGNATURES: &[Signature] = &[
    Signature {
        kind: FailureKind::Confirmation,
        needles: &[
            "could not retrieve enough confirmations",
            "not enough confirmations",
            "failed to get confirmations",
        ],
        diagnosis: "The storage network did not return enough confirmations for the upload.",
        remediation: &[
            "Wait a minute and run the same command again; storage nodes may be catching up.",
            "Check the Walrus network status for ongoing incidents.",
            "If it keeps failing, retry with fewer files or a smaller site.",
        ],
    },
    Signature {
        kind: FailureKind::Funds,
        needles: &[
            "insufficient gas",
            "insufficientgas",
            "insufficient funds",
            "insufficientcoinbalance",
            "not enough gas",
            "could not find wal coins",
            "not enough wal",
            "balance is too low",
        ],
        diagnosis: "The active wallet cannot pay for this operation.",
        remediation: &[
            "Check balances with `sui client gas` and `walrus info`.",
            "Top up SUI for gas (testnet: `sui client faucet`).",
            "Exchange SUI for WAL with `walrus get-wal` if storage funds are short.",
            "Reduce --epochs to lower the storage cost, then retry.",
        ],
    },
    Signature {
        kind: FailureKind::Configuration,
        needles: &[
            "failed to parse config",
            "invalid config",
            "error parsing config",
            "could not find a valid walrus configuration",
            "config file not found",
            "missing field",
        ],
        diagnosis: "The site-builder or walrus configuration is missing or malformed.",
        remediation: &[
            "Check sites-config.yaml and client_config.yaml under ~/.config/walrus/.",
            "Re-download the default configuration for your network.",
            "Pass the config explicitly with --config if it lives elsewhere.",
        ],
    },
    Signature {
        kind: FailureKind::Wallet,
        needles: &[
            "cannot open wallet",
            "failed to load wallet",
            "wallet not found",
            "no active address",
            "keystore not found",
            "unable to load keystore",
        ],
        diagnosis: "The Sui wallet is missing or unreadable.",
        remediation: &[
            "Run `sui client active-address` to confirm a wallet is configured.",
            "Create or import one with `sui client new-address ed25519`.",
            "Make sure ~/.sui/sui_config/client.yaml is readable by this user.",
        ],
    },
    Signature {
        kind: FailureKind::RateLimited,
        needles: &[
            "status 429",
            "http 429",
            "error 429",
            "code 429",
            "429 too many",
            "too many requests",
            "rate limit",
            "rate-limited",
        ],
        diagnosis: "The RPC endpoint is rate limiting requests.",
        remediation: &[
            "Wait a few minutes before retrying.",
            "Point the tools at a different or private RPC endpoint.",
        ],
    },
];

/// Rewrite a failed invocation into an actionable error.
///
/// `underlying` describes what went wrong at the process level (exit
/// status or runner error); it is preserved in the generic fallback.
pub fn classify_failure(tool: &str, underlying: &str, stderr: &str) -> DeployError {
    let haystack = stderr.to_lowercase();

    for sig in SIGNATURES {
        if sig.needles.iter().any(|n| haystack.contains(n)) {
            debug!(tool, kind = ?sig.kind, "classified failure");
            return DeployError::Classified {
                kind: sig.kind,
                diagnosis: sig.diagnosis.to_string(),
                remediation: sig.remediation.iter().map(|s| s.to_string()).collect(),
            };
        }
    }

    DeployError::Process {
        tool: tool.to_string(),
        message: underlying.to_string(),
    }
}
