//! # Domain Value Objects
//!
//! Immutable value types: query keys, commitment levels, confirmations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::address::{short, Address};

/// Lamports per SOL. Display conversion only.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Convert lamports to SOL for presentation.
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Named logical queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryName {
    /// Config + vault + vault balance for an administrator identity.
    AdministratorView,
    /// Beneficiary record + its cycle for a wallet identity.
    BeneficiaryView,
    /// Every beneficiary of a config.
    BeneficiaryList,
    /// Whether an arbitrary account exists.
    AccountExists,
    /// Whether an identity administers a cycle.
    CycleExists,
}

impl QueryName {
    /// Every query name; a mutation invalidates all of them.
    pub const ALL: [QueryName; 5] = [
        Self::AdministratorView,
        Self::BeneficiaryView,
        Self::BeneficiaryList,
        Self::AccountExists,
        Self::CycleExists,
    ];

    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdministratorView => "administrator_view",
            Self::BeneficiaryView => "beneficiary_view",
            Self::BeneficiaryList => "beneficiary_list",
            Self::AccountExists => "account_exists",
            Self::CycleExists => "cycle_exists",
        }
    }
}

impl fmt::Display for QueryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache key: query name plus its single address parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey {
    /// Which query.
    pub name: QueryName,
    /// Identity, config or account address, depending on `name`.
    pub param: Address,
}

impl QueryKey {
    /// Build a key.
    pub fn new(name: QueryName, param: Address) -> Self {
        Self { name, param }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, short(&self.param))
    }
}

/// Ledger commitment level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    /// Seen by the node.
    Processed,
    /// Voted on by a supermajority.
    #[default]
    Confirmed,
    /// Rooted.
    Finalized,
}

impl Commitment {
    /// JSON-RPC spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }
}

impl FromStr for Commitment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "processed" => Ok(Self::Processed),
            "confirmed" => Ok(Self::Confirmed),
            "finalized" => Ok(Self::Finalized),
            other => Err(format!("unknown commitment: {other}")),
        }
    }
}

/// Recent blockhash a transaction is anchored to.
pub use solana_sdk::hash::Hash as Blockhash;

/// Remote acceptance of a submitted request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// Base58 transaction signature.
    pub signature: String,
    /// Slot the request landed in, if reported.
    pub slot: Option<u64>,
}

/// Lifecycle state of one cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryStatus {
    /// Never fetched, or invalidated.
    Idle,
    /// A fetch is in flight.
    Loading,
    /// Last fetch succeeded.
    Success,
    /// Last fetch failed.
    Error,
}
