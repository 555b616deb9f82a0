//! # Integration Scenarios
//!
//! Orchestrator and executor driven end to end against an in-memory
//! ledger holding real account bytes.

pub mod fixtures;

mod consistency;
mod mutations;
mod resilience;
