//! # Ledger Addresses
//!
//! Addresses are the ledger's own `Pubkey`. Records that carry them go
//! through [`b58`] so human-readable serializers (JSON, config files) see
//! the base58 string while the account codec sees the 32 raw bytes, which
//! is exactly how the ledger lays addresses out inside account data.

pub use solana_sdk::pubkey::Pubkey as Address;

/// Length of an address in bytes.
pub const ADDRESS_LEN: usize = 32;

/// The native system program (all-zero key).
pub const SYSTEM_PROGRAM_ID: Address = Address::new_from_array([0u8; ADDRESS_LEN]);

/// Deployed funds-cycle program.
pub const FUNDS_CYCLE_PROGRAM_ID: Address =
    solana_sdk::pubkey!("BAmKovDnmFfuvXASrEoRa115N3F4QEBCkjUQtRAvkpAj");

/// First and last four base58 characters, for log lines.
pub fn short(address: &Address) -> String {
    let full = address.to_string();
    if full.len() <= 8 {
        return full;
    }
    format!("{}..{}", &full[..4], &full[full.len() - 4..])
}

/// `#[serde(with = "b58")]` for address fields.
pub mod b58 {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{Address, ADDRESS_LEN};

    /// Base58 string when human-readable, raw bytes otherwise.
    pub fn serialize<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(address)
        } else {
            address.to_bytes().serialize(serializer)
        }
    }

    /// Inverse of [`serialize`].
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            <[u8; ADDRESS_LEN]>::deserialize(deserializer).map(Address::new_from_array)
        }
    }
}
