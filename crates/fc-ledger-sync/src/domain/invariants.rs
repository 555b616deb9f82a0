//! # Domain Invariants
//!
//! Parameter bounds and per-transition preconditions.
//!
//! These checks run against cached snapshots and only fail fast; the
//! program re-checks everything on submission and remains authoritative.

use super::accounts::{BeneficiaryAccount, ConfigAccount};
use super::address::Address;
use super::errors::SyncError;
use super::instructions::InitializeArgs;

/// Smallest allowed participant cap.
pub const MIN_BENEFICIARIES: u8 = 3;

/// Largest allowed participant cap.
pub const MAX_BENEFICIARIES: u8 = 50;

/// Smallest allowed withdraw percentage.
pub const MIN_WITHDRAW_PERCENT: u8 = 1;

/// Largest allowed withdraw percentage.
pub const MAX_WITHDRAW_PERCENT: u8 = 50;

/// Smallest allowed payment interval, days.
pub const MIN_INTERVAL_DAYS: u16 = 1;

/// Largest allowed payment interval, days.
pub const MAX_INTERVAL_DAYS: u16 = 365;

fn ensure(condition: bool, reason: &str) -> Result<(), SyncError> {
    if condition {
        Ok(())
    } else {
        Err(SyncError::precondition(reason))
    }
}

/// Invariant: initialize arguments are within the program's bounds.
pub fn validate_initialize_args(args: &InitializeArgs) -> Result<(), SyncError> {
    ensure(
        args.collateral_amount > 0,
        "Collateral amount must be greater than 0 lamports",
    )?;
    ensure(
        args.monthly_payout > 0,
        "Monthly payout must be greater than 0 lamports",
    )?;
    ensure(
        args.monthly_payout <= args.collateral_amount,
        "Monthly payout cannot exceed collateral amount",
    )?;
    ensure(
        (MIN_BENEFICIARIES..=MAX_BENEFICIARIES).contains(&args.max_beneficiaries),
        "Max members must be between 3 and 50",
    )?;
    ensure(
        (MIN_INTERVAL_DAYS..=MAX_INTERVAL_DAYS).contains(&args.payment_interval_days),
        "Payment interval must be between 1 and 365 days",
    )?;
    ensure(
        (MIN_WITHDRAW_PERCENT..=MAX_WITHDRAW_PERCENT).contains(&args.withdraw_percent),
        "Withdraw percent must be between 1 and 50",
    )
}

/// Caller administers the cycle.
pub fn check_is_admin(config: &ConfigAccount, caller: &Address) -> Result<(), SyncError> {
    ensure(config.admin == *caller, "Only the cycle administrator can do this")
}

/// A free rotation slot exists and the wallet is not yet listed.
///
/// `listed` is the number of beneficiaries already registered; the config's
/// rotation index is not a count once withdrawals start, so the list is
/// the source of truth here.
pub fn check_can_add_beneficiary(
    config: &ConfigAccount,
    listed: usize,
    already_listed: bool,
) -> Result<(), SyncError> {
    ensure(
        listed < usize::from(config.max_beneficiaries),
        "Maximum number of beneficiaries reached",
    )?;
    ensure(!already_listed, "Beneficiary already exists for this wallet")
}

/// Collateral can be deposited.
pub fn check_deposit_collateral(beneficiary: &BeneficiaryAccount) -> Result<(), SyncError> {
    ensure(!beneficiary.collateral_paid, "Collateral already paid")
}

/// This period's contribution can be deposited.
pub fn check_deposit_monthly(beneficiary: &BeneficiaryAccount) -> Result<(), SyncError> {
    ensure(beneficiary.collateral_paid, "Collateral not paid")?;
    ensure(beneficiary.active, "Beneficiary is inactive")?;
    ensure(!beneficiary.monthly_paid, "Monthly already paid")
}

/// It is the caller's turn and they are in good standing.
pub fn check_withdraw(
    config: &ConfigAccount,
    beneficiary: &BeneficiaryAccount,
) -> Result<(), SyncError> {
    ensure(
        beneficiary.index == config.current_index,
        "It's not your turn to withdraw",
    )?;
    ensure(beneficiary.monthly_paid, "Monthly contribution not paid")?;
    ensure(beneficiary.active, "Beneficiary is inactive")
}

/// The rotation is finished and claims are not yet open.
pub fn check_enable_claiming(config: &ConfigAccount) -> Result<(), SyncError> {
    ensure(!config.claimable, "Claiming is already enabled")?;
    ensure(config.is_cycle_complete(), "Round robin cycle not complete")
}

/// Collateral can be claimed back.
pub fn check_claim_collateral(
    config: &ConfigAccount,
    beneficiary: &BeneficiaryAccount,
) -> Result<(), SyncError> {
    ensure(
        config.all_claimed(),
        "Cannot claim collateral until the cycle is complete",
    )?;
    ensure(config.claimable, "Claiming is not enabled")?;
    ensure(beneficiary.collateral_paid, "Collateral not paid")?;
    ensure(beneficiary.active, "Beneficiary is inactive")?;
    ensure(!beneficiary.collateral_claimed, "Collateral already claimed")
}

/// The cycle can be closed.
pub fn check_exit(config: &ConfigAccount) -> Result<(), SyncError> {
    ensure(config.claimable, "Claiming is not enabled")?;
    ensure(config.all_claimed(), "Not all beneficiaries have claimed")
}

/// The target missed its payment window at `now`.
pub fn check_punish(
    config: &ConfigAccount,
    target: &BeneficiaryAccount,
    now: i64,
) -> Result<(), SyncError> {
    ensure(target.active, "Beneficiary is inactive")?;
    ensure(
        target.is_overdue(config, now),
        "Payment is still on time, cannot punish",
    )
}
