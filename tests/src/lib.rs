//! # Funds-Cycle Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── ledger_sync_benchmarks.rs   # Derivation, codec, message compilation
//! └── src/integration/
//!     ├── fixtures.rs                 # Seeded mock ledger, gated gateway
//!     ├── consistency.rs              # Invalidation, late writes, cancellation
//!     ├── resilience.rs               # Retries, partial scans, roles
//!     └── mutations.rs                # Preconditions and submission outcomes
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p fc-tests
//!
//! # By category
//! cargo test -p fc-tests integration::mutations::
//!
//! # Benchmarks
//! cargo bench -p fc-tests
//! ```

pub mod integration;
