//! # Domain Module
//!
//! Core types for funds-cycle ledger sync: addresses, account records,
//! composed views, instructions, errors and precondition rules.

pub mod accounts;
pub mod address;
pub mod entities;
pub mod errors;
pub mod instructions;
pub mod invariants;
pub mod value_objects;

pub use accounts::*;
pub use address::*;
pub use entities::*;
pub use errors::*;
pub use instructions::*;
pub use invariants::*;
pub use value_objects::*;
