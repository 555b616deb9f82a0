//! # Application Module
//!
//! The query cache, the query orchestrator built on it, and the mutation
//! executor that invalidates it.

pub mod cache;
pub mod executor;
pub mod orchestrator;

pub use cache::{FetchTicket, Lookup, QueryCache};
pub use executor::MutationExecutor;
pub use orchestrator::QueryOrchestrator;
