//! # Keypair Signer
//!
//! `RequestSigner` backed by a local ledger `Keypair`. Stands in for a
//! browser wallet in the CLI and in tests.

use async_trait::async_trait;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;

use crate::algorithms::{Message, SignedRequest};
use crate::domain::{Address, SyncError};
use crate::ports::RequestSigner;

/// Local ed25519 signer.
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    /// Signer from a 32-byte secret seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            keypair: Keypair::new_from_array(seed),
        }
    }

    /// Signer from 64 bytes of secret seed followed by public key.
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self, SyncError> {
        if bytes.len() != 64 {
            return Err(SyncError::Signer(format!(
                "keypair must be 64 bytes, got {}",
                bytes.len()
            )));
        }
        let keypair = Keypair::try_from(bytes)
            .map_err(|e| SyncError::Signer(format!("inconsistent keypair: {e}")))?;
        Ok(Self { keypair })
    }

    /// Signer from a keypair file's contents: a JSON array of 64 bytes.
    pub fn from_keypair_json(json: &str) -> Result<Self, SyncError> {
        let bytes: Vec<u8> = serde_json::from_str(json)
            .map_err(|e| SyncError::Signer(format!("unreadable keypair file: {e}")))?;
        Self::from_keypair_bytes(&bytes)
    }
}

#[async_trait]
impl RequestSigner for KeypairSigner {
    fn identity(&self) -> Address {
        self.keypair.pubkey()
    }

    async fn sign(&self, message: &Message) -> Result<SignedRequest, SyncError> {
        if message.account_keys.first() != Some(&self.identity()) {
            return Err(SyncError::Signer(
                "message fee payer is not this signer".to_string(),
            ));
        }
        let blockhash = message.recent_blockhash;
        let mut transaction = Transaction::new_unsigned(message.clone());
        transaction
            .try_sign(&[&self.keypair], blockhash)
            .map_err(|e| SyncError::Signer(e.to_string()))?;
        SignedRequest::new(transaction)
    }
}
