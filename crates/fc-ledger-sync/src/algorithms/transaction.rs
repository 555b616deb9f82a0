//! # Transaction Compilation
//!
//! Single-signer legacy messages built with the ledger SDK. The caller is
//! both fee payer and the only signer; every other account is derived.

use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::domain::{Address, Blockhash, Instruction, SyncError};

pub use solana_sdk::message::Message;

/// Compile `instructions` into a message paid for and signed by `payer`.
///
/// Fails if any account other than `payer` is required to sign.
pub fn compile_message(
    payer: &Address,
    instructions: &[Instruction],
    recent_blockhash: Blockhash,
) -> Result<Message, SyncError> {
    let message = Message::new_with_blockhash(instructions, Some(payer), &recent_blockhash);
    let signers = message.header.num_required_signatures;
    if signers != 1 {
        return Err(SyncError::Signer(format!(
            "{signers} signers required, only the fee payer can sign"
        )));
    }
    Ok(message)
}

/// A signed transaction, ready for the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedRequest {
    transaction: Transaction,
}

impl SignedRequest {
    /// Wrap a transaction. Every required signature must be present.
    pub fn new(transaction: Transaction) -> Result<Self, SyncError> {
        if !transaction.is_signed() {
            return Err(SyncError::Signer("transaction is missing signatures".to_string()));
        }
        Ok(Self { transaction })
    }

    /// The signed transaction.
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Fee payer (first key).
    pub fn payer(&self) -> Option<&Address> {
        self.transaction.message.account_keys.first()
    }

    /// Whether `address` is one of the transaction's keys.
    pub fn references(&self, address: &Address) -> bool {
        self.transaction.message.account_keys.contains(address)
    }

    /// Full transaction bytes as `sendTransaction` expects them.
    pub fn wire_bytes(&self) -> Result<Vec<u8>, SyncError> {
        bincode::serialize(&self.transaction)
            .map_err(|e| SyncError::Signer(format!("unencodable transaction: {e}")))
    }

    /// First signature, the transaction id.
    pub fn signature(&self) -> Option<&Signature> {
        self.transaction.signatures.first()
    }

    /// Base58 of [`Self::signature`].
    pub fn signature_b58(&self) -> Option<String> {
        self.signature().map(ToString::to_string)
    }
}
