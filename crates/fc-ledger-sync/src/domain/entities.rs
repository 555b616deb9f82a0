//! # Domain Entities
//!
//! Composed views produced by the logical queries. All of them are
//! snapshots of remote state; the client never edits them.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::accounts::{BeneficiaryAccount, ConfigAccount, VaultAccount};
use super::address::Address;
use super::value_objects::{lamports_to_sol, QueryStatus};

/// A funds cycle as seen by its administrator: config, vault and balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleView {
    /// Config PDA.
    #[serde(with = "crate::domain::b58")]
    pub config_address: Address,
    /// Decoded config.
    pub config: ConfigAccount,
    /// Vault PDA.
    #[serde(with = "crate::domain::b58")]
    pub vault_address: Address,
    /// Decoded vault.
    pub vault: VaultAccount,
    /// Vault lamports.
    pub vault_balance: u64,
}

impl CycleView {
    /// Vault balance in SOL.
    pub fn vault_balance_sol(&self) -> f64 {
        lamports_to_sol(self.vault_balance)
    }

    /// Collateral amount in SOL.
    pub fn collateral_amount_sol(&self) -> f64 {
        lamports_to_sol(self.config.collateral_amount)
    }

    /// Monthly payout in SOL.
    pub fn monthly_payout_sol(&self) -> f64 {
        lamports_to_sol(self.config.monthly_payout)
    }
}

/// A beneficiary's own record plus the cycle it belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryView {
    /// Beneficiary PDA.
    #[serde(with = "crate::domain::b58")]
    pub beneficiary_address: Address,
    /// Decoded beneficiary.
    pub beneficiary: BeneficiaryAccount,
    /// The owning cycle.
    pub cycle: CycleView,
}

/// One row of a beneficiary list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryEntry {
    /// Beneficiary PDA.
    #[serde(with = "crate::domain::b58")]
    pub address: Address,
    /// Decoded beneficiary.
    pub account: BeneficiaryAccount,
}

/// Role of an identity with respect to a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Administers the cycle.
    Administrator,
    /// Listed as a beneficiary at this rotation index.
    Beneficiary {
        /// Rotation index.
        index: u8,
    },
    /// Neither.
    None,
}

/// Value stored under a cache key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryValue {
    /// `AdministratorView`
    Administrator(CycleView),
    /// `BeneficiaryView`
    Beneficiary(Box<BeneficiaryView>),
    /// `BeneficiaryList`
    BeneficiaryList(Vec<BeneficiaryEntry>),
    /// `AccountExists` / `CycleExists`
    Exists(bool),
}

/// Point-in-time view of one cache key.
#[derive(Clone, Debug)]
pub struct QuerySnapshot {
    /// Loading / error / success.
    pub status: QueryStatus,
    /// Last successfully fetched value, if still valid.
    pub value: Option<QueryValue>,
    /// When `value` was fetched.
    pub fetched_at: Option<Instant>,
    /// Message of the last failure, if the last fetch failed.
    pub error: Option<String>,
    /// Attempts made by the last completed fetch.
    pub attempts: u32,
    /// `value` is older than the key's staleness window.
    pub is_stale: bool,
}

impl QuerySnapshot {
    /// Snapshot of a key with no entry.
    pub fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            value: None,
            fetched_at: None,
            error: None,
            attempts: 0,
            is_stale: false,
        }
    }
}
