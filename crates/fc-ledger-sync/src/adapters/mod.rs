//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the outbound ports: a JSON-RPC ledger gateway and a local
//! keypair signer.

mod keypair_signer;
mod rpc_gateway;

pub use keypair_signer::KeypairSigner;
pub use rpc_gateway::{rejection_reason, JsonRpcError, JsonRpcGateway};
