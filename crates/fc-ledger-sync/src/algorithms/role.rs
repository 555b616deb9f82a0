//! # Role Resolution
//!
//! Single authority for "what is this identity to this cycle".
//!
//! Rules, in order:
//! 1. Administrator view loaded and its config names `identity` → `Administrator`.
//! 2. `identity` is a wallet in the beneficiary list → `Beneficiary { index }`.
//! 3. Otherwise → `None`.
//!
//! Pure: no I/O, safe to re-run whenever either input changes.

use crate::domain::{Address, BeneficiaryEntry, CycleView, Role, SyncError};

/// Resolve the role of `identity` from already-fetched results.
pub fn resolve_role(
    identity: &Address,
    administrator_view: &Result<CycleView, SyncError>,
    beneficiary_list: &Result<Vec<BeneficiaryEntry>, SyncError>,
) -> Role {
    if let Ok(view) = administrator_view {
        if view.config.admin == *identity {
            return Role::Administrator;
        }
    }

    beneficiary_list
        .as_ref()
        .ok()
        .and_then(|entries| entries.iter().find(|e| e.account.wallet == *identity))
        .map_or(Role::None, |entry| Role::Beneficiary {
            index: entry.account.index,
        })
}
