//! # Inbound Ports
//!
//! What the sync layer offers its consumers: cached logical queries and
//! state transitions.

use async_trait::async_trait;

use crate::domain::{
    Address, BeneficiaryEntry, BeneficiaryView, Confirmation, CycleView, InitializeArgs,
    QueryKey, QuerySnapshot, Role, SyncError,
};

/// Cached logical queries.
#[async_trait]
pub trait CycleQueryApi: Send + Sync {
    /// Config, vault and vault balance of the cycle `identity` administers.
    ///
    /// `NotFound` when `identity` administers no cycle.
    async fn administrator_view(&self, identity: &Address) -> Result<CycleView, SyncError>;

    /// Beneficiary record of `identity` plus its cycle.
    ///
    /// `NotFound` when `identity` is nobody's beneficiary.
    async fn beneficiary_view(&self, identity: &Address) -> Result<BeneficiaryView, SyncError>;

    /// Every decodable beneficiary of `config`, ordered by rotation index.
    async fn beneficiary_list(&self, config: &Address)
        -> Result<Vec<BeneficiaryEntry>, SyncError>;

    /// Whether any account lives at `address`.
    async fn account_exists(&self, address: &Address) -> Result<bool, SyncError>;

    /// Whether `identity` administers a cycle.
    async fn cycle_exists(&self, identity: &Address) -> Result<bool, SyncError>;

    /// Role of `identity`, loading whatever views it needs.
    async fn resolve_role(&self, identity: &Address) -> Role;

    /// Current cache state of `key`.
    fn snapshot(&self, key: &QueryKey) -> QuerySnapshot;
}

/// State transitions, signed by the executor's identity.
///
/// Each call validates against cached views, submits, and on success
/// invalidates every cached query.
#[async_trait]
pub trait CycleMutationApi: Send + Sync {
    /// Create a cycle administered by the caller.
    async fn initialize(&self, args: InitializeArgs) -> Result<Confirmation, SyncError>;

    /// Register `wallet` in the caller's cycle.
    async fn add_beneficiary(&self, wallet: &Address) -> Result<Confirmation, SyncError>;

    /// Lock the caller's collateral.
    async fn deposit_collateral(&self) -> Result<Confirmation, SyncError>;

    /// Pay the caller's contribution for this period.
    async fn deposit_monthly(&self) -> Result<Confirmation, SyncError>;

    /// Take the caller's rotation payout.
    async fn withdraw(&self) -> Result<Confirmation, SyncError>;

    /// Open collateral claims on the caller's cycle.
    async fn enable_claiming(&self) -> Result<Confirmation, SyncError>;

    /// Take the caller's collateral back.
    async fn claim_collateral(&self) -> Result<Confirmation, SyncError>;

    /// Close the caller's cycle.
    async fn exit(&self) -> Result<Confirmation, SyncError>;

    /// Deactivate `wallet` for a missed payment.
    async fn punish(&self, wallet: &Address) -> Result<Confirmation, SyncError>;
}
