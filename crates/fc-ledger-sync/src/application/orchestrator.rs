//! # Query Orchestrator
//!
//! Composes dependent fetches into cached logical queries.
//!
//! ```text
//! AdministratorView(identity)
//!     derive config ──► getAccount ──► decode Config ──► derive vault
//!                                                          │
//!                               ┌──────────────────────────┴───────┐
//!                               ▼                                  ▼
//!                   getAccount + decode Vault               getBalance(vault)
//!
//! BeneficiaryView(wallet)
//!     scan {discriminator, wallet @ 40, size} ──► decode ──► cycle of its config
//!
//! BeneficiaryList(config)
//!     scan {discriminator, config @ 8, size} ──► decode each, discard failures
//! ```
//!
//! Each logical query retries transient failures `max_retries` times with
//! linear backoff. Failures of a dependent step surface as `StaleData`; the
//! query never returns a partially populated view.

use std::sync::Arc;
use tracing::{debug, warn};

use fc_telemetry::{
    metric_inc, CACHE_HITS, CACHE_INVALIDATIONS, QUERY_FETCHES, QUERY_RETRIES, SCAN_DISCARDS,
};

use super::cache::{Lookup, QueryCache};
use crate::algorithms::{
    beneficiaries_of_config, beneficiaries_of_wallet, classify, decode, resolve_role,
    AddressDeriver, Decoded,
};
use crate::config::SyncConfig;
use crate::domain::{
    Address, BeneficiaryAccount, BeneficiaryEntry, BeneficiaryView, ConfigAccount, CycleView,
    QueryKey, QueryName, QuerySnapshot, QueryValue, Role, SyncError, VaultAccount,
};
use crate::ports::{CycleQueryApi, LedgerGateway};

/// Cached logical queries over a `LedgerGateway`.
pub struct QueryOrchestrator<G: LedgerGateway + 'static> {
    config: Arc<SyncConfig>,
    deriver: AddressDeriver,
    gateway: Arc<G>,
    cache: Arc<QueryCache>,
}

impl<G: LedgerGateway + 'static> Clone for QueryOrchestrator<G> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            deriver: self.deriver,
            gateway: Arc::clone(&self.gateway),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<G: LedgerGateway + 'static> QueryOrchestrator<G> {
    /// Orchestrator with an empty cache.
    pub fn new(config: SyncConfig, gateway: Arc<G>) -> Self {
        let cache = Arc::new(QueryCache::new(config.cache_capacity));
        Self {
            deriver: AddressDeriver::new(config.program_id),
            config: Arc::new(config),
            gateway,
            cache,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Address deriver for the configured program.
    pub fn deriver(&self) -> &AddressDeriver {
        &self.deriver
    }

    /// Underlying gateway.
    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Shared cache.
    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Cached-or-fetched value of `key`.
    ///
    /// A fresh entry is returned as is. A stale entry is returned at once
    /// and refetched in a spawned task when background refresh is on;
    /// otherwise it is refetched inline like a miss.
    pub async fn load(&self, key: QueryKey) -> Result<QueryValue, SyncError> {
        let query = key.name.as_str();
        match self.cache.lookup(&key, self.config.stale_after(key.name)) {
            Lookup::Fresh(value) => {
                metric_inc!(CACHE_HITS, &[query, "fresh"]);
                Ok(value)
            }
            Lookup::Stale(value) if self.config.background_refresh => {
                metric_inc!(CACHE_HITS, &[query, "stale"]);
                if !self.cache.is_in_flight(&key) {
                    let this = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = this.refresh(key).await {
                            debug!(query, error = %e, "background refresh failed");
                        }
                    });
                }
                Ok(value)
            }
            Lookup::Stale(_) | Lookup::Miss => self.refresh(key).await,
        }
    }

    /// Fetch `key` from the ledger, bypassing the cache, and record the
    /// outcome unless the key was invalidated meanwhile.
    pub async fn refresh(&self, key: QueryKey) -> Result<QueryValue, SyncError> {
        let query = key.name.as_str();
        let ticket = self.cache.begin(key);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.fetch(key).await {
                Ok(value) => {
                    metric_inc!(QUERY_FETCHES, &[query, "ok"]);
                    if !self.cache.complete(ticket, Ok(value.clone()), attempt) {
                        debug!(query, param = %key.param, "result predates invalidation, not cached");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt <= self.config.max_retries => {
                    warn!(query, param = %key.param, attempt, error = %e, "retrying query");
                    metric_inc!(QUERY_RETRIES, &[query]);
                    tokio::time::sleep(self.config.backoff(attempt)).await;
                }
                Err(e) => {
                    let outcome = if e.is_not_found() { "not_found" } else { "error" };
                    metric_inc!(QUERY_FETCHES, &[query, outcome]);
                    self.cache.complete(ticket, Err(e.to_string()), attempt);
                    return Err(e);
                }
            }
        }
    }

    /// Clear every logical query. Called after each successful mutation.
    pub fn invalidate_all(&self) -> usize {
        metric_inc!(CACHE_INVALIDATIONS);
        let removed = self.cache.invalidate(&QueryName::ALL);
        debug!(removed, "invalidated all queries");
        removed
    }

    /// Cached administrator view of `identity`, fresh or not.
    pub fn cached_administrator_view(&self, identity: &Address) -> Option<CycleView> {
        match self.cache.peek(&QueryKey::new(QueryName::AdministratorView, *identity)) {
            Some(QueryValue::Administrator(view)) => Some(view),
            _ => None,
        }
    }

    /// Cached beneficiary view of `identity`, fresh or not.
    pub fn cached_beneficiary_view(&self, identity: &Address) -> Option<BeneficiaryView> {
        match self.cache.peek(&QueryKey::new(QueryName::BeneficiaryView, *identity)) {
            Some(QueryValue::Beneficiary(view)) => Some(*view),
            _ => None,
        }
    }

    /// Cached beneficiary list of `config`, fresh or not.
    pub fn cached_beneficiary_list(&self, config: &Address) -> Option<Vec<BeneficiaryEntry>> {
        match self.cache.peek(&QueryKey::new(QueryName::BeneficiaryList, *config)) {
            Some(QueryValue::BeneficiaryList(entries)) => Some(entries),
            _ => None,
        }
    }

    async fn fetch(&self, key: QueryKey) -> Result<QueryValue, SyncError> {
        match key.name {
            QueryName::AdministratorView => {
                let (config_address, _) = self.deriver.config_address(&key.param)?;
                self.fetch_cycle(config_address)
                    .await
                    .map(QueryValue::Administrator)
            }
            QueryName::BeneficiaryView => self
                .fetch_beneficiary_view(key.param)
                .await
                .map(|view| QueryValue::Beneficiary(Box::new(view))),
            QueryName::BeneficiaryList => self
                .fetch_beneficiary_list(key.param)
                .await
                .map(QueryValue::BeneficiaryList),
            QueryName::AccountExists => {
                debug!(address = %key.param, "getAccountInfo (existence)");
                self.gateway
                    .account_exists(&key.param)
                    .await
                    .map(QueryValue::Exists)
            }
            QueryName::CycleExists => {
                let (config_address, _) = self.deriver.config_address(&key.param)?;
                debug!(address = %config_address, "getAccountInfo (cycle existence)");
                self.gateway
                    .account_exists(&config_address)
                    .await
                    .map(QueryValue::Exists)
            }
        }
    }

    /// Config, then vault and balance in parallel.
    async fn fetch_cycle(&self, config_address: Address) -> Result<CycleView, SyncError> {
        debug!(address = %config_address, "getAccountInfo (config)");
        let data = self
            .gateway
            .get_account(&config_address)
            .await?
            .ok_or(SyncError::NotFound {
                what: "funds cycle",
                address: config_address,
            })?;
        let config: ConfigAccount = decode(&data)?;

        let (vault_address, _) = self.deriver.vault_address(&config_address)?;
        debug!(address = %vault_address, "getAccountInfo + getBalance (vault)");
        let (vault_data, balance) = tokio::join!(
            self.gateway.get_account(&vault_address),
            self.gateway.get_balance(&vault_address),
        );

        let vault = match vault_data {
            Ok(Some(data)) => {
                decode::<VaultAccount>(&data).map_err(|e| SyncError::stale("vault", e.into()))?
            }
            Ok(None) => {
                return Err(SyncError::stale(
                    "vault",
                    SyncError::NotFound {
                        what: "vault",
                        address: vault_address,
                    },
                ))
            }
            Err(e) => return Err(SyncError::stale("vault", e)),
        };
        let vault_balance = balance.map_err(|e| SyncError::stale("vault balance", e))?;

        Ok(CycleView {
            config_address,
            config,
            vault_address,
            vault,
            vault_balance,
        })
    }

    async fn fetch_beneficiary_view(&self, wallet: Address) -> Result<BeneficiaryView, SyncError> {
        debug!(wallet = %wallet, "getProgramAccounts (beneficiary by wallet)");
        let mut hits = self
            .gateway
            .scan_program_accounts(&self.deriver.program_id(), &beneficiaries_of_wallet(&wallet))
            .await?;
        // A wallet may be listed in several cycles; lowest address wins.
        hits.sort_by(|a, b| a.0.cmp(&b.0));

        let (beneficiary_address, beneficiary) = hits
            .into_iter()
            .find_map(|(address, data)| match decode::<BeneficiaryAccount>(&data) {
                Ok(account) => Some((address, account)),
                Err(e) => {
                    warn!(address = %address, error = %e, "discarding undecodable beneficiary");
                    metric_inc!(SCAN_DISCARDS);
                    None
                }
            })
            .ok_or(SyncError::NotFound {
                what: "beneficiary",
                address: wallet,
            })?;

        let cycle = self
            .fetch_cycle(beneficiary.config)
            .await
            .map_err(|e| SyncError::stale("cycle", e))?;

        Ok(BeneficiaryView {
            beneficiary_address,
            beneficiary,
            cycle,
        })
    }

    async fn fetch_beneficiary_list(
        &self,
        config: Address,
    ) -> Result<Vec<BeneficiaryEntry>, SyncError> {
        debug!(config = %config, "getProgramAccounts (beneficiaries of config)");
        let hits = self
            .gateway
            .scan_program_accounts(&self.deriver.program_id(), &beneficiaries_of_config(&config))
            .await?;

        let mut entries: Vec<BeneficiaryEntry> = hits
            .into_iter()
            .filter_map(|(address, data)| match classify::<BeneficiaryAccount>(&data) {
                Decoded::Record(account) => Some(BeneficiaryEntry { address, account }),
                other => {
                    warn!(address = %address, outcome = ?other, "discarding undecodable beneficiary");
                    metric_inc!(SCAN_DISCARDS);
                    None
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            a.account
                .index
                .cmp(&b.account.index)
                .then_with(|| a.address.cmp(&b.address))
        });
        Ok(entries)
    }
}

fn unexpected(key: QueryKey, value: &QueryValue) -> SyncError {
    let held = match value {
        QueryValue::Administrator(_) => "administrator view",
        QueryValue::Beneficiary(_) => "beneficiary view",
        QueryValue::BeneficiaryList(_) => "beneficiary list",
        QueryValue::Exists(_) => "existence flag",
    };
    SyncError::gateway("query cache", format!("{key} held a {held}"))
}

#[async_trait::async_trait]
impl<G: LedgerGateway + 'static> CycleQueryApi for QueryOrchestrator<G> {
    async fn administrator_view(&self, identity: &Address) -> Result<CycleView, SyncError> {
        let key = QueryKey::new(QueryName::AdministratorView, *identity);
        match self.load(key).await? {
            QueryValue::Administrator(view) => Ok(view),
            other => Err(unexpected(key, &other)),
        }
    }

    async fn beneficiary_view(&self, identity: &Address) -> Result<BeneficiaryView, SyncError> {
        let key = QueryKey::new(QueryName::BeneficiaryView, *identity);
        match self.load(key).await? {
            QueryValue::Beneficiary(view) => Ok(*view),
            other => Err(unexpected(key, &other)),
        }
    }

    async fn beneficiary_list(
        &self,
        config: &Address,
    ) -> Result<Vec<BeneficiaryEntry>, SyncError> {
        let key = QueryKey::new(QueryName::BeneficiaryList, *config);
        match self.load(key).await? {
            QueryValue::BeneficiaryList(entries) => Ok(entries),
            other => Err(unexpected(key, &other)),
        }
    }

    async fn account_exists(&self, address: &Address) -> Result<bool, SyncError> {
        let key = QueryKey::new(QueryName::AccountExists, *address);
        match self.load(key).await? {
            QueryValue::Exists(exists) => Ok(exists),
            other => Err(unexpected(key, &other)),
        }
    }

    async fn cycle_exists(&self, identity: &Address) -> Result<bool, SyncError> {
        let key = QueryKey::new(QueryName::CycleExists, *identity);
        match self.load(key).await? {
            QueryValue::Exists(exists) => Ok(exists),
            other => Err(unexpected(key, &other)),
        }
    }

    async fn resolve_role(&self, identity: &Address) -> Role {
        let admin = self.administrator_view(identity).await;
        let list = if admin.is_ok() {
            // Administrator wins regardless of the list.
            Ok(Vec::new())
        } else {
            match self.beneficiary_view(identity).await {
                Ok(view) => self.beneficiary_list(&view.cycle.config_address).await,
                Err(e) => Err(e),
            }
        };
        let role = resolve_role(identity, &admin, &list);
        debug!(identity = %identity, ?role, "resolved role");
        role
    }

    fn snapshot(&self, key: &QueryKey) -> QuerySnapshot {
        self.cache.snapshot(key, self.config.stale_after(key.name))
    }
}
