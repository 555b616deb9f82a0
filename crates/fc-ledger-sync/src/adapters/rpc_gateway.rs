//! # JSON-RPC Ledger Gateway
//!
//! `LedgerGateway` over the ledger's HTTP JSON-RPC 2.0 API.
//!
//! | Port operation | RPC method |
//! |----------------|------------|
//! | `account_exists`, `get_account` | `getAccountInfo` |
//! | `get_balance` | `getBalance` |
//! | `scan_program_accounts` | `getProgramAccounts` with `memcmp` / `dataSize` |
//! | `latest_blockhash` | `getLatestBlockhash` |
//! | `submit` | `sendTransaction`, then `getSignatureStatuses` until confirmed |
//!
//! Account data is requested base58-encoded; every funds-cycle account is
//! well under the encoder's size limit.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::algorithms::{ScanQuery, SignedRequest};
use crate::config::SyncConfig;
use crate::domain::{Address, Blockhash, Commitment, Confirmation, SyncError};
use crate::ports::LedgerGateway;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: T,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
    /// Method-specific details (simulation logs for `sendTransaction`).
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct UiAccount {
    data: (String, String),
}

#[derive(Debug, Deserialize)]
struct KeyedAccount {
    pubkey: String,
    account: UiAccount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestBlockhash {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    slot: u64,
    #[serde(default)]
    err: Option<Value>,
    #[serde(default)]
    confirmation_status: Option<Commitment>,
}

enum RpcFailure {
    Transport(String),
    Remote(JsonRpcError),
}

/// Gateway speaking JSON-RPC over HTTP.
pub struct JsonRpcGateway {
    http_client: reqwest::Client,
    rpc_url: String,
    commitment: Commitment,
    confirm_timeout: Duration,
    confirm_poll: Duration,
    request_id: AtomicU64,
}

impl JsonRpcGateway {
    /// Gateway for `config.endpoint()`.
    pub fn new(config: &SyncConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client,
            rpc_url: config.endpoint().to_string(),
            commitment: config.commitment,
            confirm_timeout: Duration::from_secs(config.confirm_timeout_secs),
            confirm_poll: Duration::from_millis(config.confirm_poll_ms),
            request_id: AtomicU64::new(1),
        }
    }

    /// Endpoint in use.
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    async fn call_raw<P: Serialize + Send, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, RpcFailure> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        debug!(method, id, "rpc call");

        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcFailure::Transport(format!("failed to send request: {e}")))?;

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| RpcFailure::Transport(format!("failed to parse response: {e}")))?;

        if let Some(error) = rpc_response.error {
            return Err(RpcFailure::Remote(error));
        }
        rpc_response
            .result
            .ok_or_else(|| RpcFailure::Transport("response missing result".to_string()))
    }

    async fn call<P: Serialize + Send, R: DeserializeOwned>(
        &self,
        operation: &'static str,
        params: P,
    ) -> Result<R, SyncError> {
        self.call_raw(operation, params).await.map_err(|f| match f {
            RpcFailure::Transport(message) => SyncError::gateway(operation, message),
            RpcFailure::Remote(e) => {
                SyncError::gateway(operation, format!("RPC error {}: {}", e.code, e.message))
            }
        })
    }

    async fn fetch_account(&self, address: &Address) -> Result<Option<Vec<u8>>, SyncError> {
        let reply: WithContext<Option<UiAccount>> = self
            .call(
                "getAccountInfo",
                json!([
                    address.to_string(),
                    {"encoding": "base58", "commitment": self.commitment.as_str()}
                ]),
            )
            .await?;
        reply
            .value
            .map(|account| decode_account_data(&account.data))
            .transpose()
    }

    /// Poll `getSignatureStatuses` until the request reaches the wanted
    /// commitment, fails on-ledger, or `confirm_timeout` passes. A failed
    /// poll says nothing about the request itself and is only logged.
    async fn await_confirmation(&self, signature: &str) -> Result<Confirmation, SyncError> {
        let deadline = Instant::now() + self.confirm_timeout;
        let mut last_failure: Option<SyncError> = None;
        loop {
            let polled: Result<WithContext<Vec<Option<SignatureStatus>>>, SyncError> = self
                .call(
                    "getSignatureStatuses",
                    json!([[signature], {"searchTransactionHistory": false}]),
                )
                .await;

            match polled {
                Ok(reply) => {
                    last_failure = None;
                    if let Some(status) = reply.value.into_iter().next().flatten() {
                        if let Some(outcome) =
                            confirmation_outcome(&status, self.commitment, signature)
                        {
                            return outcome;
                        }
                    }
                }
                Err(e) => {
                    warn!(signature, error = %e, "status poll failed, still waiting");
                    last_failure = Some(e);
                }
            }

            if Instant::now() >= deadline {
                let mut reason = format!(
                    "not confirmed within {}s",
                    self.confirm_timeout.as_secs()
                );
                if let Some(e) = last_failure {
                    reason.push_str(&format!("; last status poll failed: {e}"));
                }
                return Err(SyncError::Unconfirmed {
                    signature: signature.to_string(),
                    reason,
                });
            }
            tokio::time::sleep(self.confirm_poll).await;
        }
    }
}

fn decode_account_data(data: &(String, String)) -> Result<Vec<u8>, SyncError> {
    let (payload, encoding) = data;
    if encoding != "base58" {
        return Err(SyncError::gateway(
            "getAccountInfo",
            format!("unexpected data encoding {encoding}"),
        ));
    }
    bs58::decode(payload)
        .into_vec()
        .map_err(|e| SyncError::gateway("getAccountInfo", format!("bad account data: {e}")))
}

fn scan_params(program_id: &Address, query: &ScanQuery, commitment: Commitment) -> Value {
    let mut filters: Vec<Value> = query
        .memcmp
        .iter()
        .map(|f| {
            json!({"memcmp": {
                "offset": f.offset,
                "bytes": bs58::encode(&f.bytes).into_string(),
                "encoding": "base58",
            }})
        })
        .collect();
    if let Some(size) = query.data_size {
        filters.push(json!({"dataSize": size}));
    }
    json!([
        program_id.to_string(),
        {"encoding": "base58", "commitment": commitment.as_str(), "filters": filters}
    ])
}

/// `Some` once the status is final for our purposes: failed, or at the
/// wanted commitment.
fn confirmation_outcome(
    status: &SignatureStatus,
    wanted: Commitment,
    signature: &str,
) -> Option<Result<Confirmation, SyncError>> {
    if let Some(err) = status.err.as_ref().filter(|e| !e.is_null()) {
        return Some(Err(SyncError::Submission {
            reason: Some(err.to_string()),
            signature: Some(signature.to_string()),
        }));
    }
    match status.confirmation_status {
        Some(reached) if reached >= wanted => Some(Ok(Confirmation {
            signature: signature.to_string(),
            slot: Some(status.slot),
        })),
        _ => None,
    }
}

/// Best human-readable reason for a rejected `sendTransaction`.
///
/// Prefers the program's own error message from the simulation logs
/// (`... Error Message: <text>.`) over the generic RPC message.
pub fn rejection_reason(error: &JsonRpcError) -> String {
    let from_logs = error
        .data
        .as_ref()
        .and_then(|d| d.get("logs"))
        .and_then(Value::as_array)
        .and_then(|logs| {
            logs.iter()
                .filter_map(Value::as_str)
                .find_map(|line| line.split_once("Error Message: ").map(|(_, m)| m))
        })
        .map(|m| m.trim_end_matches('.').to_string());

    from_logs.unwrap_or_else(|| error.message.clone())
}

#[async_trait]
impl LedgerGateway for JsonRpcGateway {
    async fn account_exists(&self, address: &Address) -> Result<bool, SyncError> {
        Ok(self.fetch_account(address).await?.is_some())
    }

    async fn get_account(&self, address: &Address) -> Result<Option<Vec<u8>>, SyncError> {
        self.fetch_account(address).await
    }

    async fn get_balance(&self, address: &Address) -> Result<u64, SyncError> {
        let reply: WithContext<u64> = self
            .call(
                "getBalance",
                json!([address.to_string(), {"commitment": self.commitment.as_str()}]),
            )
            .await?;
        Ok(reply.value)
    }

    async fn scan_program_accounts(
        &self,
        program_id: &Address,
        query: &ScanQuery,
    ) -> Result<Vec<(Address, Vec<u8>)>, SyncError> {
        let accounts: Vec<KeyedAccount> = self
            .call(
                "getProgramAccounts",
                scan_params(program_id, query, self.commitment),
            )
            .await?;

        accounts
            .into_iter()
            .map(|keyed| {
                let address = keyed.pubkey.parse::<Address>().map_err(|e| {
                    SyncError::gateway("getProgramAccounts", format!("bad pubkey: {e}"))
                })?;
                Ok((address, decode_account_data(&keyed.account.data)?))
            })
            .collect()
    }

    async fn latest_blockhash(&self) -> Result<Blockhash, SyncError> {
        let reply: WithContext<LatestBlockhash> = self
            .call(
                "getLatestBlockhash",
                json!([{"commitment": self.commitment.as_str()}]),
            )
            .await?;
        reply.value.blockhash.parse().map_err(|e| {
            SyncError::gateway("getLatestBlockhash", format!("bad blockhash: {e}"))
        })
    }

    async fn submit(&self, request: &SignedRequest) -> Result<Confirmation, SyncError> {
        let encoded = bs58::encode(request.wire_bytes()?).into_string();
        let sent: Result<String, RpcFailure> = self
            .call_raw(
                "sendTransaction",
                json!([
                    encoded,
                    {"encoding": "base58", "preflightCommitment": self.commitment.as_str()}
                ]),
            )
            .await;

        let signature = match sent {
            Ok(signature) => signature,
            Err(RpcFailure::Remote(error)) => {
                let reason = rejection_reason(&error);
                warn!(code = error.code, %reason, "transaction rejected");
                return Err(SyncError::Submission {
                    reason: Some(reason),
                    signature: request.signature_b58(),
                });
            }
            Err(RpcFailure::Transport(message)) => {
                return Err(SyncError::gateway("sendTransaction", message));
            }
        };

        self.await_confirmation(&signature).await
    }
}
