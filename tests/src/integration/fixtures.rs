//! Shared fixtures: a seeded mock ledger and a gateway whose calls can be
//! held open.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use fc_ledger_sync::{
    Address, AddressDeriver, BeneficiaryAccount, Blockhash, ConfigAccount, Confirmation,
    KeypairSigner, LedgerGateway, Message, MockLedgerGateway, MutationExecutor,
    QueryOrchestrator, RequestSigner, ScanQuery, SignedRequest, SyncConfig, SyncError,
    VaultAccount,
};

/// Lamports locked in every seeded vault.
pub const VAULT_BALANCE: u64 = 2_500_000_000;

/// Deterministic wallet address.
pub fn wallet(n: u8) -> Address {
    Address::new_from_array([n; 32])
}

/// Deterministic signer.
pub fn signer(seed: u8) -> KeypairSigner {
    KeypairSigner::from_seed([seed; 32])
}

/// Five-seat cycle: 1 SOL collateral, 0.1 SOL monthly, 30 day interval.
pub fn cycle_config(admin: Address) -> ConfigAccount {
    ConfigAccount {
        admin,
        collateral_amount: 1_000_000_000,
        monthly_payout: 100_000_000,
        payment_interval_days: 30,
        withdraw_percent: 10,
        max_beneficiaries: 5,
        current_index: 0,
        bump: 255,
        claimable: false,
        claims_completed: 0,
    }
}

/// Beneficiary in good standing at `index`.
pub fn beneficiary(config: Address, wallet: Address, index: u8) -> BeneficiaryAccount {
    BeneficiaryAccount {
        config,
        wallet,
        bump: 254,
        index,
        collateral_paid: true,
        monthly_paid: false,
        last_payment_ts: chrono::Utc::now().timestamp(),
        active: true,
        collateral_claimed: false,
    }
}

/// Mock ledger plus an orchestrator reading it.
pub struct Ledger<G: LedgerGateway + 'static = MockLedgerGateway> {
    /// Raw account store.
    pub mock: Arc<MockLedgerGateway>,
    /// What the orchestrator talks to.
    pub gateway: Arc<G>,
    /// Cached queries.
    pub queries: QueryOrchestrator<G>,
    /// Derivations for the configured program.
    pub deriver: AddressDeriver,
}

impl Ledger<MockLedgerGateway> {
    /// Empty ledger with test configuration.
    pub fn new() -> Self {
        Self::with_config(SyncConfig::for_testing())
    }

    /// Empty ledger with `config`.
    pub fn with_config(config: SyncConfig) -> Self {
        let mock = Arc::new(MockLedgerGateway::new());
        let deriver = AddressDeriver::new(config.program_id);
        Self {
            queries: QueryOrchestrator::new(config, Arc::clone(&mock)),
            gateway: Arc::clone(&mock),
            mock,
            deriver,
        }
    }
}

impl Default for Ledger<MockLedgerGateway> {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger<GatedGateway> {
    /// Empty ledger behind a gated gateway.
    pub fn gated() -> Self {
        let config = SyncConfig::for_testing();
        let mock = Arc::new(MockLedgerGateway::new());
        let gateway = Arc::new(GatedGateway::new(Arc::clone(&mock)));
        let deriver = AddressDeriver::new(config.program_id);
        Self {
            queries: QueryOrchestrator::new(config, Arc::clone(&gateway)),
            gateway,
            mock,
            deriver,
        }
    }
}

impl<G: LedgerGateway + 'static> Ledger<G> {
    /// Config address of `admin`'s cycle.
    pub fn config_address(&self, admin: &Address) -> Address {
        self.deriver.config_address(admin).map(|(a, _)| a).unwrap()
    }

    /// Store `config` and its vault. Returns the config address.
    pub fn seed_cycle(&self, config: &ConfigAccount) -> Address {
        let config_address = self.config_address(&config.admin);
        let (vault_address, bump) = self.deriver.vault_address(&config_address).unwrap();
        self.mock.put_record(config_address, config);
        self.mock.put_record(
            vault_address,
            &VaultAccount {
                config: config_address,
                bump,
            },
        );
        self.mock.set_balance(vault_address, VAULT_BALANCE);
        config_address
    }

    /// Overwrite an already seeded config.
    pub fn update_config(&self, config: &ConfigAccount) {
        let config_address = self.config_address(&config.admin);
        self.mock.put_record(config_address, config);
    }

    /// Store `account` at its derived address. Returns that address.
    pub fn seed_beneficiary(&self, account: &BeneficiaryAccount) -> Address {
        let (address, _) = self
            .deriver
            .beneficiary_address(&account.config, &account.wallet)
            .unwrap();
        self.mock.put_record(address, account);
        address
    }

    /// Executor signing as `signer`, sharing this ledger's cache.
    pub fn executor(&self, signer: KeypairSigner) -> MutationExecutor<G, KeypairSigner> {
        MutationExecutor::new(self.queries.clone(), Arc::new(signer))
    }
}

/// Seed a five-seat cycle for `admin` with `listed` beneficiaries at
/// wallets 100, 101, ... Returns the config address.
pub fn seed_cycle_with_beneficiaries<G: LedgerGateway + 'static>(
    ledger: &Ledger<G>,
    admin: Address,
    listed: u8,
) -> Address {
    let config_address = ledger.seed_cycle(&cycle_config(admin));
    for i in 0..listed {
        ledger.seed_beneficiary(&beneficiary(config_address, wallet(100 + i), i));
    }
    config_address
}

/// Gateway that can hold reads or submissions until released.
pub struct GatedGateway {
    inner: Arc<MockLedgerGateway>,
    reads: watch::Sender<bool>,
    submits: watch::Sender<bool>,
    waiting: AtomicUsize,
}

impl GatedGateway {
    /// Open gateway over `inner`.
    pub fn new(inner: Arc<MockLedgerGateway>) -> Self {
        Self {
            inner,
            reads: watch::channel(true).0,
            submits: watch::channel(true).0,
            waiting: AtomicUsize::new(0),
        }
    }

    /// Hold or release reads.
    pub fn set_reads_open(&self, open: bool) {
        self.reads.send_replace(open);
    }

    /// Hold or release submissions.
    pub fn set_submits_open(&self, open: bool) {
        self.submits.send_replace(open);
    }

    /// Calls currently held.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    async fn pass(&self, gate: &watch::Sender<bool>) {
        let mut rx = gate.subscribe();
        let open = *rx.borrow();
        if open {
            return;
        }
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let _ = rx.wait_for(|open| *open).await;
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerGateway for GatedGateway {
    async fn account_exists(&self, address: &Address) -> Result<bool, SyncError> {
        self.pass(&self.reads).await;
        self.inner.account_exists(address).await
    }

    async fn get_account(&self, address: &Address) -> Result<Option<Vec<u8>>, SyncError> {
        self.pass(&self.reads).await;
        self.inner.get_account(address).await
    }

    async fn get_balance(&self, address: &Address) -> Result<u64, SyncError> {
        self.pass(&self.reads).await;
        self.inner.get_balance(address).await
    }

    async fn scan_program_accounts(
        &self,
        program_id: &Address,
        query: &ScanQuery,
    ) -> Result<Vec<(Address, Vec<u8>)>, SyncError> {
        self.pass(&self.reads).await;
        self.inner.scan_program_accounts(program_id, query).await
    }

    async fn latest_blockhash(&self) -> Result<Blockhash, SyncError> {
        self.inner.latest_blockhash().await
    }

    async fn submit(&self, request: &SignedRequest) -> Result<Confirmation, SyncError> {
        self.pass(&self.submits).await;
        self.inner.submit(request).await
    }
}

/// Signer that reports one identity but signs as another.
pub struct ImpostorSigner {
    /// Identity claimed.
    pub claimed: Address,
    /// Key actually used.
    pub real: KeypairSigner,
}

#[async_trait]
impl RequestSigner for ImpostorSigner {
    fn identity(&self) -> Address {
        self.claimed
    }

    async fn sign(&self, message: &Message) -> Result<SignedRequest, SyncError> {
        self.real.sign(message).await
    }
}
