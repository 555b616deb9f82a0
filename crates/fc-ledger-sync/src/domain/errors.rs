//! # Domain Errors
//!
//! Error taxonomy for the sync layer.
//!
//! | Variant | Retried | Meaning |
//! |---------|---------|---------|
//! | `InvalidSeed` | never | derivation input malformed (caller bug) |
//! | `Decode` | never | buffer is not the expected record kind |
//! | `NotFound` | never | valid "absent" answer, not a failure |
//! | `Gateway` | bounded | transport or response-parse failure |
//! | `PreconditionFailed` | never | local validation, nothing was sent |
//! | `Submission` | never | remote rejected the request |
//! | `Unconfirmed` | never | sent, but no verdict before the confirmation deadline |
//! | `StaleData` | if inner is | a dependent step of a composed query failed |

use super::accounts::RecordKind;
use super::address::Address;
use thiserror::Error;

/// Account codec failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Buffer prefix does not identify the expected record kind.
    #[error("discriminator mismatch: buffer is not a {kind} account")]
    DiscriminatorMismatch {
        /// Kind the caller asked for.
        kind: RecordKind,
    },

    /// Buffer has the right prefix but the wrong length.
    #[error("{kind} account must be {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Kind the caller asked for.
        kind: RecordKind,
        /// Fixed record size.
        expected: usize,
        /// Length of the buffer.
        actual: usize,
    },

    /// Field bytes could not be read (e.g. a bool byte other than 0/1).
    #[error("malformed {kind} account: {reason}")]
    Malformed {
        /// Kind the caller asked for.
        kind: RecordKind,
        /// Serializer message.
        reason: String,
    },
}

/// Sync layer error.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Seeds exceed the derivation limits, or no bump produced an address.
    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    /// Account data did not decode as the expected record.
    #[error(transparent)]
    Decode(#[from] CodecError),

    /// The remote has no such account.
    #[error("{what} not found at {address}")]
    NotFound {
        /// Human name of the missing thing.
        what: &'static str,
        /// Where it was looked up.
        address: Address,
    },

    /// Transport or response-parse failure talking to the ledger.
    #[error("gateway error during {operation}: {message}")]
    Gateway {
        /// Remote operation name.
        operation: &'static str,
        /// Underlying failure.
        message: String,
    },

    /// A locally-known precondition does not hold; nothing was submitted.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// The remote rejected a submitted request.
    #[error("submission rejected: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Submission {
        /// Remote-supplied reason, when one was available.
        reason: Option<String>,
        /// Signature of the rejected request, when it got that far.
        signature: Option<String>,
    },

    /// The request was sent but its outcome was not observed in time. It
    /// may still land, so callers must not treat this as a rejection.
    #[error("request {signature} not confirmed: {reason}")]
    Unconfirmed {
        /// Signature of the sent request.
        signature: String,
        /// What was last seen while waiting.
        reason: String,
    },

    /// A dependent step of a multi-step query failed after retries.
    #[error("stale data: {step} fetch failed: {source}")]
    StaleData {
        /// Which dependent step failed.
        step: &'static str,
        /// Why it failed.
        #[source]
        source: Box<SyncError>,
    },

    /// The signer could not produce a signed request.
    #[error("signer error: {0}")]
    Signer(String),
}

impl SyncError {
    /// Shorthand for a gateway failure.
    pub fn gateway(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Gateway {
            operation,
            message: message.into(),
        }
    }

    /// Shorthand for a precondition failure.
    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::PreconditionFailed(reason.into())
    }

    /// Wrap a dependent-step failure.
    pub fn stale(step: &'static str, source: SyncError) -> Self {
        Self::StaleData {
            step,
            source: Box::new(source),
        }
    }

    /// Whether the orchestrator should retry the logical query.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Gateway { .. } => true,
            Self::StaleData { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Whether the request may have reached the ledger and changed state.
    pub fn may_have_landed(&self) -> bool {
        matches!(self, Self::Unconfirmed { .. })
    }

    /// Whether this is the "absent" outcome rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Short message for user-facing surfaces.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidSeed(_) => "Invalid address".to_string(),
            Self::Decode(_) => "Unexpected account data".to_string(),
            Self::NotFound { what, .. } => format!("No {what} found"),
            Self::Gateway { .. } => "Network error, please retry".to_string(),
            Self::PreconditionFailed(reason) => reason.clone(),
            Self::Submission { reason, .. } => reason
                .clone()
                .unwrap_or_else(|| "Transaction rejected".to_string()),
            Self::Unconfirmed { .. } => {
                "Transaction sent, confirmation pending. Refresh before retrying".to_string()
            }
            Self::StaleData { .. } => "Could not load the full funds cycle".to_string(),
            Self::Signer(_) => "Wallet could not sign the request".to_string(),
        }
    }
}
