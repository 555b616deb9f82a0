//! # Program Address Derivation
//!
//! Deterministic, offline computation of program-owned addresses.
//!
//! The search itself is the ledger's (`Pubkey::try_find_program_address`):
//! for bump 255 down to 0, hash `seeds || [bump] || program_id ||
//! "ProgramDerivedAddress"` and keep the first candidate that is not an
//! ed25519 point. This module adds the seed limits as typed errors.

use crate::domain::{Address, SyncError};

/// Seed prefix of a cycle config.
pub const CONFIG_SEED: &[u8] = b"config";

/// Seed prefix of a cycle vault.
pub const VAULT_SEED: &[u8] = b"vault";

/// Seed prefix of a beneficiary record.
pub const BENEFICIARY_SEED: &[u8] = b"beneficiary";

/// Maximum number of seeds, including the bump.
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single seed.
pub const MAX_SEED_LEN: usize = 32;

fn check_seeds(seeds: &[&[u8]]) -> Result<(), SyncError> {
    if seeds.len() > MAX_SEEDS {
        return Err(SyncError::InvalidSeed(format!(
            "{} seeds, at most {} allowed",
            seeds.len(),
            MAX_SEEDS
        )));
    }
    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(SyncError::InvalidSeed(format!(
            "seed of {} bytes exceeds {} byte limit",
            seed.len(),
            MAX_SEED_LEN
        )));
    }
    Ok(())
}

/// Hash `seeds` (bump included by the caller) into an address.
///
/// Fails with `InvalidSeed` if the seeds break the limits or the result
/// lies on the curve.
pub fn create_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<Address, SyncError> {
    check_seeds(seeds)?;
    Address::create_program_address(seeds, program_id)
        .map_err(|e| SyncError::InvalidSeed(e.to_string()))
}

/// Find the canonical (highest-bump) program address for `seeds`.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<(Address, u8), SyncError> {
    // One slot is reserved for the bump.
    if seeds.len() >= MAX_SEEDS {
        return Err(SyncError::InvalidSeed(format!(
            "{} seeds leave no room for the bump",
            seeds.len()
        )));
    }
    check_seeds(seeds)?;

    Address::try_find_program_address(seeds, program_id).ok_or_else(|| {
        SyncError::InvalidSeed("no bump produced an off-curve address".to_string())
    })
}

/// The three canonical derivations for one program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressDeriver {
    program_id: Address,
}

impl AddressDeriver {
    /// Deriver for `program_id`.
    pub fn new(program_id: Address) -> Self {
        Self { program_id }
    }

    /// Program the addresses belong to.
    pub fn program_id(&self) -> Address {
        self.program_id
    }

    /// Config of the cycle administered by `admin`.
    pub fn config_address(&self, admin: &Address) -> Result<(Address, u8), SyncError> {
        find_program_address(&[CONFIG_SEED, admin.as_ref()], &self.program_id)
    }

    /// Vault of `config`.
    pub fn vault_address(&self, config: &Address) -> Result<(Address, u8), SyncError> {
        find_program_address(&[VAULT_SEED, config.as_ref()], &self.program_id)
    }

    /// Beneficiary record of `wallet` in `config`.
    pub fn beneficiary_address(
        &self,
        config: &Address,
        wallet: &Address,
    ) -> Result<(Address, u8), SyncError> {
        find_program_address(
            &[BENEFICIARY_SEED, config.as_ref(), wallet.as_ref()],
            &self.program_id,
        )
    }
}
