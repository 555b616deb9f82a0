//! # Mutation Executor
//!
//! One operation per state transition. Each runs:
//!
//! 1. in-flight guard: the same transition for the same identity never
//!    runs twice at once
//! 2. advisory preconditions against cached views (nothing is sent when
//!    they fail)
//! 3. build, compile, sign, submit
//! 4. on acceptance, invalidate every cached query; on rejection, leave
//!    the cache alone
//!
//! Once a request is sent the executor waits for the remote outcome. The
//! in-flight slot stays claimed until that outcome is known, even if the
//! caller gives up first. A request whose confirmation never arrived may
//! still land, so it invalidates like an acceptance.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use fc_telemetry::{metric_inc, MUTATIONS};

use super::orchestrator::QueryOrchestrator;
use crate::algorithms::{compile_message, InstructionBuilder, SignedRequest};
use crate::domain::{
    check_can_add_beneficiary, check_claim_collateral, check_deposit_collateral,
    check_deposit_monthly, check_enable_claiming, check_exit, check_is_admin, check_punish,
    check_withdraw, validate_initialize_args, Address, BeneficiaryEntry, BeneficiaryView,
    Confirmation, CycleView, InitializeArgs, Instruction, MutationKind, SyncError,
};
use crate::ports::{CycleMutationApi, CycleQueryApi, LedgerGateway, RequestSigner};

const NOT_LOADED: &str = "Funds cycle data not loaded";

type Slot = (Address, MutationKind);

/// Releases an in-flight slot on drop.
struct InFlightGuard {
    slots: Arc<Mutex<HashSet<Slot>>>,
    slot: Slot,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.slots.lock().remove(&self.slot);
    }
}

/// Executes state transitions as the signer's identity.
pub struct MutationExecutor<G: LedgerGateway + 'static, S: RequestSigner> {
    queries: QueryOrchestrator<G>,
    builder: InstructionBuilder,
    signer: Arc<S>,
    in_flight: Arc<Mutex<HashSet<Slot>>>,
}

impl<G: LedgerGateway + 'static, S: RequestSigner> MutationExecutor<G, S> {
    /// Executor sharing `queries`' cache and gateway.
    pub fn new(queries: QueryOrchestrator<G>, signer: Arc<S>) -> Self {
        Self {
            builder: InstructionBuilder::new(*queries.deriver()),
            queries,
            signer,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Identity every transition is signed as.
    pub fn identity(&self) -> Address {
        self.signer.identity()
    }

    /// Query side this executor invalidates.
    pub fn queries(&self) -> &QueryOrchestrator<G> {
        &self.queries
    }

    fn claim(&self, kind: MutationKind) -> Result<InFlightGuard, SyncError> {
        let slot = (self.identity(), kind);
        if !self.in_flight.lock().insert(slot) {
            return Err(self.refused(
                kind,
                SyncError::precondition(format!("{kind} is already in progress")),
            ));
        }
        Ok(InFlightGuard {
            slots: Arc::clone(&self.in_flight),
            slot,
        })
    }

    fn refused(&self, kind: MutationKind, error: SyncError) -> SyncError {
        warn!(kind = %kind, error = %error, "mutation refused locally");
        metric_inc!(MUTATIONS, &[kind.as_str(), "precondition"]);
        error
    }

    fn administrator_view(&self) -> Result<CycleView, SyncError> {
        let identity = self.identity();
        let view = self
            .queries
            .cached_administrator_view(&identity)
            .ok_or_else(|| SyncError::precondition(NOT_LOADED))?;
        check_is_admin(&view.config, &identity)?;
        Ok(view)
    }

    fn beneficiary_view(&self) -> Result<BeneficiaryView, SyncError> {
        self.queries
            .cached_beneficiary_view(&self.identity())
            .ok_or_else(|| SyncError::precondition(NOT_LOADED))
    }

    async fn listed_beneficiaries(&self, config: &Address) -> Result<Vec<BeneficiaryEntry>, SyncError> {
        match self.queries.cached_beneficiary_list(config) {
            Some(entries) => Ok(entries),
            None => self.queries.beneficiary_list(config).await,
        }
    }

    async fn prepare_initialize(&self, args: &InitializeArgs) -> Result<Instruction, SyncError> {
        validate_initialize_args(args)?;
        let identity = self.identity();
        if self.queries.cycle_exists(&identity).await? {
            return Err(SyncError::precondition(
                "Funds cycle already exists for this admin",
            ));
        }
        self.builder.initialize(&identity, args)
    }

    async fn prepare_add_beneficiary(&self, wallet: &Address) -> Result<Instruction, SyncError> {
        let view = self.administrator_view()?;
        let entries = self.listed_beneficiaries(&view.config_address).await?;
        let already_listed = entries.iter().any(|e| e.account.wallet == *wallet);
        check_can_add_beneficiary(&view.config, entries.len(), already_listed)?;
        self.builder.add_beneficiary(&self.identity(), wallet)
    }

    async fn prepare_punish(&self, wallet: &Address) -> Result<Instruction, SyncError> {
        let view = self.administrator_view()?;
        let entries = self.listed_beneficiaries(&view.config_address).await?;
        let target = entries
            .iter()
            .find(|e| e.account.wallet == *wallet)
            .ok_or_else(|| SyncError::precondition("Beneficiary not found in this funds cycle"))?;
        check_punish(&view.config, &target.account, chrono::Utc::now().timestamp())?;
        self.builder.punish(&self.identity(), wallet)
    }

    /// Run a transition whose preconditions are in `prepared`.
    async fn execute(
        &self,
        kind: MutationKind,
        guard: InFlightGuard,
        prepared: Result<Instruction, SyncError>,
    ) -> Result<Confirmation, SyncError> {
        let request = prepared.map_err(|e| match e {
            SyncError::PreconditionFailed(_) => self.refused(kind, e),
            other => other,
        })?;

        let signed = match self.sign(request).await {
            Ok(signed) => signed,
            Err(e) => {
                warn!(kind = %kind, error = %e, "mutation failed before submission");
                metric_inc!(MUTATIONS, &[kind.as_str(), "failed"]);
                return Err(e);
            }
        };

        // Runs to completion even if the caller stops polling, and holds
        // the in-flight slot until the remote outcome is known.
        let queries = self.queries.clone();
        let task = tokio::spawn(async move {
            let _guard = guard;
            let outcome = queries.gateway().submit(&signed).await;
            match &outcome {
                Ok(confirmation) => {
                    queries.invalidate_all();
                    info!(kind = %kind, signature = %confirmation.signature, "mutation confirmed");
                    metric_inc!(MUTATIONS, &[kind.as_str(), "confirmed"]);
                }
                Err(e) if e.may_have_landed() => {
                    queries.invalidate_all();
                    warn!(kind = %kind, error = %e, "mutation outcome unknown");
                    metric_inc!(MUTATIONS, &[kind.as_str(), "unconfirmed"]);
                }
                Err(e @ SyncError::Submission { .. }) => {
                    warn!(kind = %kind, error = %e, "mutation rejected");
                    metric_inc!(MUTATIONS, &[kind.as_str(), "rejected"]);
                }
                Err(e) => {
                    warn!(kind = %kind, error = %e, "mutation failed");
                    metric_inc!(MUTATIONS, &[kind.as_str(), "failed"]);
                }
            }
            outcome
        });
        task.await.map_err(|e| SyncError::Submission {
            reason: Some(format!("submission task failed: {e}")),
            signature: None,
        })?
    }

    async fn sign(&self, request: Instruction) -> Result<SignedRequest, SyncError> {
        let blockhash = self.queries.gateway().latest_blockhash().await?;
        let message = compile_message(&self.identity(), &[request], blockhash)?;
        self.signer.sign(&message).await
    }
}

#[async_trait]
impl<G: LedgerGateway + 'static, S: RequestSigner> CycleMutationApi for MutationExecutor<G, S> {
    async fn initialize(&self, args: InitializeArgs) -> Result<Confirmation, SyncError> {
        let kind = MutationKind::Initialize;
        let guard = self.claim(kind)?;
        let prepared = self.prepare_initialize(&args).await;
        self.execute(kind, guard, prepared).await
    }

    async fn add_beneficiary(&self, wallet: &Address) -> Result<Confirmation, SyncError> {
        let kind = MutationKind::AddBeneficiary;
        let guard = self.claim(kind)?;
        let prepared = self.prepare_add_beneficiary(wallet).await;
        self.execute(kind, guard, prepared).await
    }

    async fn deposit_collateral(&self) -> Result<Confirmation, SyncError> {
        let kind = MutationKind::DepositCollateral;
        let guard = self.claim(kind)?;
        let prepared = self.beneficiary_view().and_then(|view| {
            check_deposit_collateral(&view.beneficiary)?;
            self.builder
                .deposit_collateral(&self.identity(), &view.cycle.config_address)
        });
        self.execute(kind, guard, prepared).await
    }

    async fn deposit_monthly(&self) -> Result<Confirmation, SyncError> {
        let kind = MutationKind::DepositMonthly;
        let guard = self.claim(kind)?;
        let prepared = self.beneficiary_view().and_then(|view| {
            check_deposit_monthly(&view.beneficiary)?;
            self.builder
                .deposit_monthly(&self.identity(), &view.cycle.config_address)
        });
        self.execute(kind, guard, prepared).await
    }

    async fn withdraw(&self) -> Result<Confirmation, SyncError> {
        let kind = MutationKind::Withdraw;
        let guard = self.claim(kind)?;
        let prepared = self.beneficiary_view().and_then(|view| {
            check_withdraw(&view.cycle.config, &view.beneficiary)?;
            self.builder
                .withdraw(&self.identity(), &view.cycle.config_address)
        });
        self.execute(kind, guard, prepared).await
    }

    async fn enable_claiming(&self) -> Result<Confirmation, SyncError> {
        let kind = MutationKind::EnableClaiming;
        let guard = self.claim(kind)?;
        let prepared = self.administrator_view().and_then(|view| {
            check_enable_claiming(&view.config)?;
            self.builder.enable_claiming(&self.identity())
        });
        self.execute(kind, guard, prepared).await
    }

    async fn claim_collateral(&self) -> Result<Confirmation, SyncError> {
        let kind = MutationKind::ClaimCollateral;
        let guard = self.claim(kind)?;
        let prepared = self.beneficiary_view().and_then(|view| {
            check_claim_collateral(&view.cycle.config, &view.beneficiary)?;
            self.builder
                .claim_collateral(&self.identity(), &view.cycle.config_address)
        });
        self.execute(kind, guard, prepared).await
    }

    async fn exit(&self) -> Result<Confirmation, SyncError> {
        let kind = MutationKind::Exit;
        let guard = self.claim(kind)?;
        let prepared = self.administrator_view().and_then(|view| {
            check_exit(&view.config)?;
            self.builder.exit(&self.identity())
        });
        self.execute(kind, guard, prepared).await
    }

    async fn punish(&self, wallet: &Address) -> Result<Confirmation, SyncError> {
        let kind = MutationKind::Punish;
        let guard = self.claim(kind)?;
        let prepared = self.prepare_punish(wallet).await;
        self.execute(kind, guard, prepared).await
    }
}
