//! # Outbound Ports
//!
//! Dependencies of the sync layer: the ledger gateway and the request
//! signer (the wallet collaborator).
//!
//! Gateways never retry. Retry policy belongs to the orchestrator so each
//! logical query can count its own attempts.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::algorithms::{encode, Message, ScanQuery, SignedRequest};
use crate::domain::{AccountRecord, Address, Blockhash, Confirmation, SyncError};

/// Ledger I/O boundary.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// `false` on a clean "not found"; `Gateway` on transport failure.
    async fn account_exists(&self, address: &Address) -> Result<bool, SyncError>;

    /// Raw account data, `None` when absent.
    async fn get_account(&self, address: &Address) -> Result<Option<Vec<u8>>, SyncError>;

    /// Lamport balance; zero for an absent account.
    async fn get_balance(&self, address: &Address) -> Result<u64, SyncError>;

    /// Program-owned accounts matching every constraint of `query`.
    ///
    /// Result order is unspecified.
    async fn scan_program_accounts(
        &self,
        program_id: &Address,
        query: &ScanQuery,
    ) -> Result<Vec<(Address, Vec<u8>)>, SyncError>;

    /// Blockhash to anchor a new transaction to.
    async fn latest_blockhash(&self) -> Result<Blockhash, SyncError>;

    /// Send and wait for acceptance or rejection. `Unconfirmed` when sent
    /// but no verdict arrived in time.
    async fn submit(&self, request: &SignedRequest) -> Result<Confirmation, SyncError>;
}

/// Signs compiled messages on behalf of one identity.
#[async_trait]
pub trait RequestSigner: Send + Sync {
    /// Public address of the signer.
    fn identity(&self) -> Address;

    /// Sign `message`.
    async fn sign(&self, message: &Message) -> Result<SignedRequest, SyncError>;
}

// =============================================================================
// Mock Implementation for Testing
// =============================================================================

#[derive(Default)]
struct MockState {
    accounts: HashMap<Address, Vec<u8>>,
    balances: HashMap<Address, u64>,
    failing: HashSet<Address>,
    fail_next_reads: usize,
    hang_reads: bool,
    reject_reason: Option<Option<String>>,
    lose_confirmations: bool,
    submitted: Vec<SignedRequest>,
}

/// In-memory ledger.
///
/// Holds raw account buffers, so tests exercise the real codec and
/// filters. Reads and submissions are counted.
#[derive(Default)]
pub struct MockLedgerGateway {
    state: Mutex<MockState>,
    get_account_calls: AtomicUsize,
    balance_calls: AtomicUsize,
    scan_calls: AtomicUsize,
    exists_calls: AtomicUsize,
}

impl MockLedgerGateway {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record` at `address`.
    pub fn put_record<T: AccountRecord>(&self, address: Address, record: &T) {
        // Records built in tests always fit their layout.
        if let Ok(bytes) = encode(record) {
            self.put_raw(address, bytes);
        }
    }

    /// Store raw bytes at `address`.
    pub fn put_raw(&self, address: Address, bytes: Vec<u8>) {
        self.state.lock().accounts.insert(address, bytes);
    }

    /// Delete the account at `address`.
    pub fn remove(&self, address: &Address) {
        self.state.lock().accounts.remove(address);
    }

    /// Set the lamport balance of `address`.
    pub fn set_balance(&self, address: Address, lamports: u64) {
        self.state.lock().balances.insert(address, lamports);
    }

    /// Fail the next `n` reads with a transport error.
    pub fn fail_next_reads(&self, n: usize) {
        self.state.lock().fail_next_reads = n;
    }

    /// Always fail reads of `address`.
    pub fn fail_address(&self, address: Address) {
        self.state.lock().failing.insert(address);
    }

    /// Stop failing reads of `address`.
    pub fn heal_address(&self, address: &Address) {
        self.state.lock().failing.remove(address);
    }

    /// Make every read wait forever.
    pub fn hang_reads(&self, hang: bool) {
        self.state.lock().hang_reads = hang;
    }

    /// Reject submissions, optionally with a remote reason.
    pub fn reject_submissions(&self, reason: Option<&str>) {
        self.state.lock().reject_reason = Some(reason.map(str::to_string));
    }

    /// Accept submissions again.
    pub fn accept_submissions(&self) {
        self.state.lock().reject_reason = None;
    }

    /// Accepted submissions report `Unconfirmed` instead of a confirmation.
    pub fn lose_confirmations(&self, lose: bool) {
        self.state.lock().lose_confirmations = lose;
    }

    /// Requests accepted or rejected so far.
    pub fn submissions(&self) -> Vec<SignedRequest> {
        self.state.lock().submitted.clone()
    }

    /// Number of submissions.
    pub fn submission_count(&self) -> usize {
        self.state.lock().submitted.len()
    }

    /// Number of `get_account` calls.
    pub fn get_account_calls(&self) -> usize {
        self.get_account_calls.load(Ordering::SeqCst)
    }

    /// Number of `get_balance` calls.
    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }

    /// Number of scans.
    pub fn scan_calls(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }

    /// Number of `account_exists` calls.
    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    /// Total reads of any kind.
    pub fn read_calls(&self) -> usize {
        self.get_account_calls() + self.balance_calls() + self.scan_calls() + self.exists_calls()
    }

    async fn before_read(&self, operation: &'static str, address: Option<&Address>) -> Result<(), SyncError> {
        let hang = {
            let mut state = self.state.lock();
            if state.fail_next_reads > 0 {
                state.fail_next_reads -= 1;
                return Err(SyncError::gateway(operation, "mock transport failure"));
            }
            if address.is_some_and(|a| state.failing.contains(a)) {
                return Err(SyncError::gateway(operation, "mock address unavailable"));
            }
            state.hang_reads
        };
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerGateway for MockLedgerGateway {
    async fn account_exists(&self, address: &Address) -> Result<bool, SyncError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.before_read("getAccountInfo", Some(address)).await?;
        Ok(self.state.lock().accounts.contains_key(address))
    }

    async fn get_account(&self, address: &Address) -> Result<Option<Vec<u8>>, SyncError> {
        self.get_account_calls.fetch_add(1, Ordering::SeqCst);
        self.before_read("getAccountInfo", Some(address)).await?;
        Ok(self.state.lock().accounts.get(address).cloned())
    }

    async fn get_balance(&self, address: &Address) -> Result<u64, SyncError> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        self.before_read("getBalance", Some(address)).await?;
        Ok(self.state.lock().balances.get(address).copied().unwrap_or(0))
    }

    async fn scan_program_accounts(
        &self,
        _program_id: &Address,
        query: &ScanQuery,
    ) -> Result<Vec<(Address, Vec<u8>)>, SyncError> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        self.before_read("getProgramAccounts", None).await?;
        Ok(self
            .state
            .lock()
            .accounts
            .iter()
            .filter(|(_, data)| query.matches(data))
            .map(|(address, data)| (*address, data.clone()))
            .collect())
    }

    async fn latest_blockhash(&self) -> Result<Blockhash, SyncError> {
        Ok(Blockhash::new_from_array([42u8; 32]))
    }

    async fn submit(&self, request: &SignedRequest) -> Result<Confirmation, SyncError> {
        let mut state = self.state.lock();
        state.submitted.push(request.clone());
        let signature = request.signature_b58();
        if let Some(reason) = state.reject_reason.clone() {
            return Err(SyncError::Submission { reason, signature });
        }
        if state.lose_confirmations {
            return Err(SyncError::Unconfirmed {
                signature: signature.unwrap_or_default(),
                reason: "mock confirmation lost".to_string(),
            });
        }
        Ok(Confirmation {
            signature: signature.unwrap_or_default(),
            slot: Some(state.submitted.len() as u64),
        })
    }
}
