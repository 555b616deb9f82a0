//! # Sync Configuration
//!
//! Endpoint, retry, staleness and cache settings.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::{Address, Commitment, QueryName, FUNDS_CYCLE_PROGRAM_ID};

/// Ledger cluster; picks the default RPC endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cluster {
    /// Public devnet.
    #[default]
    Devnet,
    /// Public testnet.
    Testnet,
    /// Mainnet beta.
    Mainnet,
    /// Local validator.
    Localnet,
}

impl Cluster {
    /// Public RPC endpoint of the cluster.
    pub fn rpc_url(&self) -> &'static str {
        match self {
            Self::Devnet => "https://api.devnet.solana.com",
            Self::Testnet => "https://api.testnet.solana.com",
            Self::Mainnet => "https://api.mainnet-beta.solana.com",
            Self::Localnet => "http://127.0.0.1:8899",
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Devnet => "devnet",
            Self::Testnet => "testnet",
            Self::Mainnet => "mainnet",
            Self::Localnet => "localnet",
        };
        f.write_str(name)
    }
}

impl FromStr for Cluster {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "devnet" => Ok(Self::Devnet),
            "testnet" => Ok(Self::Testnet),
            "mainnet" | "mainnet-beta" => Ok(Self::Mainnet),
            "localnet" | "localhost" => Ok(Self::Localnet),
            other => Err(format!("unknown cluster: {other}")),
        }
    }
}

/// Sync layer configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Cluster, used when `rpc_url` is empty.
    pub cluster: Cluster,

    /// JSON-RPC endpoint override.
    pub rpc_url: String,

    /// Funds-cycle program.
    #[serde(with = "crate::domain::b58")]
    pub program_id: Address,

    /// Commitment for reads and confirmations.
    pub commitment: Commitment,

    /// Retries of a logical query after its first attempt.
    pub max_retries: u32,

    /// Backoff unit; attempt `n` waits `n * retry_backoff_ms`.
    pub retry_backoff_ms: u64,

    /// Freshness window of `AdministratorView`.
    pub admin_view_stale_ms: u64,

    /// Freshness window of `BeneficiaryView`.
    pub beneficiary_view_stale_ms: u64,

    /// Freshness window of `BeneficiaryList`.
    pub beneficiary_list_stale_ms: u64,

    /// Freshness window of `AccountExists` and `CycleExists`.
    pub existence_stale_ms: u64,

    /// Maximum cached keys.
    pub cache_capacity: usize,

    /// Serve stale values while refetching in the background.
    pub background_refresh: bool,

    /// HTTP request timeout.
    pub request_timeout_secs: u64,

    /// How long to wait for a submission to reach `commitment`.
    pub confirm_timeout_secs: u64,

    /// Signature status poll interval.
    pub confirm_poll_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cluster: Cluster::Devnet,
            rpc_url: String::new(),
            program_id: FUNDS_CYCLE_PROGRAM_ID,
            commitment: Commitment::Confirmed,
            max_retries: 2,
            retry_backoff_ms: 250,
            admin_view_stale_ms: 10_000,
            beneficiary_view_stale_ms: 10_000,
            beneficiary_list_stale_ms: 60_000,
            existence_stale_ms: 30_000,
            cache_capacity: 256,
            background_refresh: true,
            request_timeout_secs: 10,
            confirm_timeout_secs: 60,
            confirm_poll_ms: 500,
        }
    }
}

impl SyncConfig {
    /// Create a config for testing (no backoff, no background refresh).
    pub fn for_testing() -> Self {
        Self {
            cluster: Cluster::Localnet,
            retry_backoff_ms: 0,
            cache_capacity: 64,
            background_refresh: false,
            request_timeout_secs: 2,
            confirm_timeout_secs: 5,
            confirm_poll_ms: 10,
            ..Self::default()
        }
    }

    /// Defaults overridden from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `FC_CLUSTER`: devnet, testnet, mainnet or localnet (default: devnet)
    /// - `FC_RPC_URL`: endpoint override
    /// - `FC_PROGRAM_ID`: program address (default: the deployed program)
    /// - `FC_COMMITMENT`: processed, confirmed or finalized (default: confirmed)
    /// - `FC_MAX_RETRIES`: retries per logical query (default: 2)
    ///
    /// Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = env::var("FC_CLUSTER") {
            match v.parse() {
                Ok(cluster) => config.cluster = cluster,
                Err(e) => tracing::warn!("ignoring FC_CLUSTER: {}", e),
            }
        }
        if let Ok(v) = env::var("FC_RPC_URL") {
            config.rpc_url = v;
        }
        if let Ok(v) = env::var("FC_PROGRAM_ID") {
            match v.parse() {
                Ok(program_id) => config.program_id = program_id,
                Err(e) => tracing::warn!("ignoring FC_PROGRAM_ID: {}", e),
            }
        }
        if let Ok(v) = env::var("FC_COMMITMENT") {
            match v.parse() {
                Ok(commitment) => config.commitment = commitment,
                Err(e) => tracing::warn!("ignoring FC_COMMITMENT: {}", e),
            }
        }
        if let Some(retries) = env::var("FC_MAX_RETRIES").ok().and_then(|v| v.parse().ok()) {
            config.max_retries = retries;
        }

        config
    }

    /// Effective RPC endpoint.
    pub fn endpoint(&self) -> &str {
        if self.rpc_url.is_empty() {
            self.cluster.rpc_url()
        } else {
            &self.rpc_url
        }
    }

    /// Freshness window of `name`.
    pub fn stale_after(&self, name: QueryName) -> Duration {
        let ms = match name {
            QueryName::AdministratorView => self.admin_view_stale_ms,
            QueryName::BeneficiaryView => self.beneficiary_view_stale_ms,
            QueryName::BeneficiaryList => self.beneficiary_list_stale_ms,
            QueryName::AccountExists | QueryName::CycleExists => self.existence_stale_ms,
        };
        Duration::from_millis(ms)
    }

    /// Delay before retry `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}
