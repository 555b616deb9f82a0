//! # Account Records
//!
//! Typed mirrors of the funds-cycle program accounts.
//!
//! Every account starts with an 8-byte discriminator (the first 8 bytes of
//! `sha256("account:<Name>")`) followed by its fields, little-endian, in
//! declared order. The sizes below are what the program allocates and are
//! used both for `dataSize` scan filters and for the decode length check.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::address::Address;

/// Length of every account discriminator.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Account discriminator bytes.
pub type Discriminator = [u8; DISCRIMINATOR_LEN];

/// Seconds per day, the unit of `payment_interval_days`.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Byte offset of `BeneficiaryAccount::config` inside the raw account.
pub const BENEFICIARY_CONFIG_OFFSET: usize = DISCRIMINATOR_LEN;

/// Byte offset of `BeneficiaryAccount::wallet` inside the raw account.
pub const BENEFICIARY_WALLET_OFFSET: usize = DISCRIMINATOR_LEN + 32;

/// Which record a buffer encodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// `ConfigAccount`
    Config,
    /// `VaultAccount`
    Vault,
    /// `BeneficiaryAccount`
    Beneficiary,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Config => "Config",
            Self::Vault => "Vault",
            Self::Beneficiary => "Beneficiary",
        };
        f.write_str(name)
    }
}

/// A fixed-layout, discriminator-tagged program account.
///
/// The serde field order *is* the wire layout; implementors must declare
/// fields exactly as the program does.
pub trait AccountRecord: Serialize + for<'de> Deserialize<'de> {
    /// Record kind, for errors and logs.
    const KIND: RecordKind;
    /// Leading tag bytes.
    const DISCRIMINATOR: Discriminator;
    /// Total account size including the discriminator.
    const SIZE: usize;
}

/// One funds cycle, keyed by its administrator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigAccount {
    /// Cycle administrator.
    #[serde(with = "crate::domain::b58")]
    pub admin: Address,
    /// Collateral each beneficiary locks, in lamports.
    pub collateral_amount: u64,
    /// Monthly contribution per beneficiary, in lamports.
    pub monthly_payout: u64,
    /// Days between payments.
    pub payment_interval_days: u16,
    /// Share of the monthly pool paid out per withdrawal (1-50).
    pub withdraw_percent: u8,
    /// Participant cap (3-50).
    pub max_beneficiaries: u8,
    /// Rotation position: whose turn it is to withdraw.
    pub current_index: u8,
    /// PDA bump.
    pub bump: u8,
    /// Collateral claims have been enabled by the administrator.
    pub claimable: bool,
    /// Number of collateral claims completed.
    pub claims_completed: u8,
}

impl AccountRecord for ConfigAccount {
    const KIND: RecordKind = RecordKind::Config;
    const DISCRIMINATOR: Discriminator = [189, 255, 97, 70, 186, 189, 24, 102];
    const SIZE: usize = DISCRIMINATOR_LEN + 32 + 8 + 8 + 2 + 1 + 1 + 1 + 1 + 1 + 1;
}

impl ConfigAccount {
    /// Payment interval in seconds.
    pub fn payment_interval_secs(&self) -> i64 {
        i64::from(self.payment_interval_days) * SECONDS_PER_DAY
    }

    /// Every rotation slot has had its turn.
    pub fn is_cycle_complete(&self) -> bool {
        self.current_index >= self.max_beneficiaries
    }

    /// Every participant has claimed their collateral back.
    pub fn all_claimed(&self) -> bool {
        self.claims_completed >= self.max_beneficiaries
    }

    /// Lamports paid out on a single withdrawal.
    pub fn withdrawal_amount(&self) -> Option<u64> {
        self.monthly_payout
            .checked_mul(u64::from(self.max_beneficiaries))?
            .checked_mul(u64::from(self.withdraw_percent))?
            .checked_div(100)
    }
}

/// Pooled-funds account; its lamport balance is read separately.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultAccount {
    /// Owning config.
    #[serde(with = "crate::domain::b58")]
    pub config: Address,
    /// PDA bump.
    pub bump: u8,
}

impl AccountRecord for VaultAccount {
    const KIND: RecordKind = RecordKind::Vault;
    const DISCRIMINATOR: Discriminator = [230, 251, 241, 83, 139, 202, 93, 28];
    const SIZE: usize = DISCRIMINATOR_LEN + 32 + 1;
}

/// One participant in one cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryAccount {
    /// Owning config.
    #[serde(with = "crate::domain::b58")]
    pub config: Address,
    /// Participant wallet.
    #[serde(with = "crate::domain::b58")]
    pub wallet: Address,
    /// PDA bump.
    pub bump: u8,
    /// Zero-based rotation index.
    pub index: u8,
    /// Collateral deposited.
    pub collateral_paid: bool,
    /// This period's contribution deposited.
    pub monthly_paid: bool,
    /// Unix timestamp of the last monthly payment.
    pub last_payment_ts: i64,
    /// Cleared when the administrator punishes a late payer.
    pub active: bool,
    /// Collateral returned.
    pub collateral_claimed: bool,
}

impl AccountRecord for BeneficiaryAccount {
    const KIND: RecordKind = RecordKind::Beneficiary;
    const DISCRIMINATOR: Discriminator = [63, 115, 143, 239, 199, 217, 180, 40];
    const SIZE: usize = DISCRIMINATOR_LEN + 32 + 32 + 1 + 1 + 1 + 1 + 8 + 1 + 1;
}

impl BeneficiaryAccount {
    /// Unix timestamp after which the next payment is late.
    pub fn payment_due_ts(&self, config: &ConfigAccount) -> i64 {
        self.last_payment_ts
            .saturating_add(config.payment_interval_secs())
    }

    /// Payment is overdue at `now`.
    pub fn is_overdue(&self, config: &ConfigAccount, now: i64) -> bool {
        now > self.payment_due_ts(config)
    }
}
