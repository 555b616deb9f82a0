//! # Algorithms Module
//!
//! Pure logic: derivation, account codec, scan filters, role resolution,
//! instruction building and message compilation.

pub mod codec;
pub mod derivation;
pub mod filters;
pub mod instruction_builder;
pub mod role;
pub mod transaction;

pub use codec::{classify, decode, encode, Decoded};
pub use derivation::{
    create_program_address, find_program_address, AddressDeriver, BENEFICIARY_SEED, CONFIG_SEED,
    MAX_SEEDS, MAX_SEED_LEN, VAULT_SEED,
};
pub use filters::{beneficiaries_of_config, beneficiaries_of_wallet, MemcmpFilter, ScanQuery};
pub use instruction_builder::InstructionBuilder;
pub use role::resolve_role;
pub use transaction::{compile_message, Message, SignedRequest};
