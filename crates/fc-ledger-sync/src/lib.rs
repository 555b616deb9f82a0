//! # Funds-Cycle Ledger Sync
//!
//! Client-side state access for the funds-cycle program: derives account
//! addresses, decodes account data, caches composed views, and submits
//! state transitions.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Data Flow
//!
//! ```text
//! AddressDeriver ──► LedgerGateway ──► AccountCodec ──► QueryOrchestrator ──► resolve_role
//!                          ▲                                   │
//!                          │ submit                 cached views│ invalidate
//!                          │                                   ▼
//!                          └────────────────────────── MutationExecutor
//! ```
//!
//! ## Consistency
//!
//! | Rule | Where |
//! |------|-------|
//! | Cache written only by a completed fetch of its own key | `QueryCache::complete` |
//! | Every accepted mutation invalidates every query | `MutationExecutor` |
//! | Fetches that began before an invalidation do not write | `FetchTicket` epochs |
//! | A rejected mutation leaves the cache untouched | `MutationExecutor` |
//! | Partial decode failure never fails a beneficiary list | `QueryOrchestrator` |
//!
//! ## Module Structure
//!
//! ```text
//! fc-ledger-sync/
//! ├── domain/          # Addresses, account records, views, errors, preconditions
//! ├── algorithms/      # Derivation, codec, scan filters, roles, instructions, messages
//! ├── ports/           # API traits (inbound) + gateway/signer traits (outbound)
//! ├── adapters/        # JSON-RPC gateway, keypair signer
//! ├── application/     # QueryCache, QueryOrchestrator, MutationExecutor
//! └── config.rs        # SyncConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{JsonRpcGateway, KeypairSigner};
pub use algorithms::{
    classify, compile_message, decode, encode, find_program_address, resolve_role,
    AddressDeriver, Decoded, InstructionBuilder, Message, ScanQuery, SignedRequest,
};
pub use application::{MutationExecutor, QueryCache, QueryOrchestrator};
pub use config::{Cluster, SyncConfig};
pub use domain::{
    lamports_to_sol, AccountMeta, AccountRecord, Address, BeneficiaryAccount, BeneficiaryEntry,
    BeneficiaryView, Blockhash, CodecError, Commitment, ConfigAccount, Confirmation, CycleView,
    InitializeArgs, Instruction, MutationKind, QueryKey, QueryName, QuerySnapshot, QueryStatus,
    QueryValue, Role, SyncError, VaultAccount, FUNDS_CYCLE_PROGRAM_ID, SECONDS_PER_DAY,
    SYSTEM_PROGRAM_ID,
};
pub use ports::{
    CycleMutationApi, CycleQueryApi, LedgerGateway, MockLedgerGateway, RequestSigner,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
