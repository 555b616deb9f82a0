//! # Program Instructions
//!
//! Request shapes for the funds-cycle state transitions.
//!
//! Instruction data is an 8-byte selector (`sha256("global:<name>")[..8]`)
//! followed by the little-endian arguments.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::accounts::Discriminator;

pub use solana_sdk::instruction::{AccountMeta, Instruction};

/// `initialize`
pub const IX_INITIALIZE: Discriminator = [175, 175, 109, 31, 13, 152, 155, 237];
/// `add_beneficiary`
pub const IX_ADD_BENEFICIARY: Discriminator = [105, 214, 106, 141, 180, 166, 123, 238];
/// `deposit_collateral`
pub const IX_DEPOSIT_COLLATERAL: Discriminator = [156, 131, 142, 116, 146, 247, 162, 120];
/// `deposit_monthly`
pub const IX_DEPOSIT_MONTHLY: Discriminator = [252, 123, 80, 64, 66, 80, 61, 199];
/// `withdraw`
pub const IX_WITHDRAW: Discriminator = [183, 18, 70, 156, 148, 109, 161, 34];
/// `punish`
pub const IX_PUNISH: Discriminator = [111, 102, 66, 126, 232, 125, 236, 171];
/// `enable_claiming`
pub const IX_ENABLE_CLAIMING: Discriminator = [125, 165, 100, 79, 224, 80, 88, 119];
/// `claim_collateral`
pub const IX_CLAIM_COLLATERAL: Discriminator = [55, 78, 194, 172, 196, 18, 230, 252];
/// `exit`
pub const IX_EXIT: Discriminator = [234, 32, 12, 71, 126, 5, 219, 160];

/// One state transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    /// Create config and vault.
    Initialize,
    /// Register a wallet in the next rotation slot.
    AddBeneficiary,
    /// Lock collateral.
    DepositCollateral,
    /// Pay this period's contribution.
    DepositMonthly,
    /// Take the rotation payout.
    Withdraw,
    /// Open collateral claims.
    EnableClaiming,
    /// Take collateral back.
    ClaimCollateral,
    /// Close config and vault.
    Exit,
    /// Deactivate a late payer.
    Punish,
}

impl MutationKind {
    /// Instruction name as the program spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::AddBeneficiary => "add_beneficiary",
            Self::DepositCollateral => "deposit_collateral",
            Self::DepositMonthly => "deposit_monthly",
            Self::Withdraw => "withdraw",
            Self::EnableClaiming => "enable_claiming",
            Self::ClaimCollateral => "claim_collateral",
            Self::Exit => "exit",
            Self::Punish => "punish",
        }
    }

    /// Instruction selector.
    pub fn discriminator(&self) -> Discriminator {
        match self {
            Self::Initialize => IX_INITIALIZE,
            Self::AddBeneficiary => IX_ADD_BENEFICIARY,
            Self::DepositCollateral => IX_DEPOSIT_COLLATERAL,
            Self::DepositMonthly => IX_DEPOSIT_MONTHLY,
            Self::Withdraw => IX_WITHDRAW,
            Self::EnableClaiming => IX_ENABLE_CLAIMING,
            Self::ClaimCollateral => IX_CLAIM_COLLATERAL,
            Self::Exit => IX_EXIT,
            Self::Punish => IX_PUNISH,
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments of `initialize`, in wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeArgs {
    /// Collateral per beneficiary, lamports.
    pub collateral_amount: u64,
    /// Monthly contribution per beneficiary, lamports.
    pub monthly_payout: u64,
    /// Days between payments.
    pub payment_interval_days: u16,
    /// Participant cap.
    pub max_beneficiaries: u8,
    /// Payout share per withdrawal.
    pub withdraw_percent: u8,
}
