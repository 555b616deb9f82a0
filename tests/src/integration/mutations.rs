//! # State Transitions
//!
//! Local preconditions, submission outcomes and the in-flight guard.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use fc_ledger_sync::{
        CycleMutationApi, CycleQueryApi, InitializeArgs, MutationExecutor, QueryKey, QueryName,
        QueryStatus, RequestSigner, SyncError, SECONDS_PER_DAY,
    };

    use crate::integration::fixtures::{
        beneficiary, cycle_config, seed_cycle_with_beneficiaries, signer, wallet,
        ImpostorSigner, Ledger,
    };

    fn reason(err: &SyncError) -> &str {
        match err {
            SyncError::PreconditionFailed(reason) => reason,
            other => panic!("expected a precondition failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sixth_beneficiary_rejected_before_any_network_call() {
        let ledger = Ledger::new();
        let admin_signer = signer(1);
        let admin = admin_signer.identity();
        let config_address = seed_cycle_with_beneficiaries(&ledger, admin, 5);
        let executor = ledger.executor(admin_signer);

        ledger.queries.administrator_view(&admin).await.unwrap();
        ledger.queries.beneficiary_list(&config_address).await.unwrap();
        let reads = ledger.mock.read_calls();

        let err = executor.add_beneficiary(&wallet(200)).await.unwrap_err();
        assert_eq!(reason(&err), "Maximum number of beneficiaries reached");
        assert_eq!(ledger.mock.read_calls(), reads);
        assert_eq!(ledger.mock.submission_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_beneficiary_rejected() {
        let ledger = Ledger::new();
        let admin_signer = signer(1);
        let admin = admin_signer.identity();
        seed_cycle_with_beneficiaries(&ledger, admin, 3);
        let executor = ledger.executor(admin_signer);
        ledger.queries.administrator_view(&admin).await.unwrap();

        let err = executor.add_beneficiary(&wallet(100)).await.unwrap_err();
        assert_eq!(reason(&err), "Beneficiary already exists for this wallet");
        assert_eq!(ledger.mock.submission_count(), 0);
    }

    #[tokio::test]
    async fn test_add_beneficiary_references_derived_address() {
        let ledger = Ledger::new();
        let admin_signer = signer(1);
        let admin = admin_signer.identity();
        let config_address = seed_cycle_with_beneficiaries(&ledger, admin, 3);
        let executor = ledger.executor(admin_signer);
        ledger.queries.administrator_view(&admin).await.unwrap();

        executor.add_beneficiary(&wallet(200)).await.unwrap();

        let (expected, _) = ledger
            .deriver
            .beneficiary_address(&config_address, &wallet(200))
            .unwrap();
        let submitted = ledger.mock.submissions();
        assert_eq!(submitted.len(), 1);
        assert!(submitted[0].references(&expected));
        assert_eq!(submitted[0].payer(), Some(&admin));
    }

    #[tokio::test]
    async fn test_withdraw_out_of_turn_never_submits() {
        let ledger = Ledger::new();
        let admin = wallet(1);
        let member_signer = signer(50);
        let member = member_signer.identity();

        let mut config = cycle_config(admin);
        config.current_index = 1;
        let config_address = ledger.seed_cycle(&config);
        let mut account = beneficiary(config_address, member, 2);
        account.monthly_paid = true;
        ledger.seed_beneficiary(&account);

        let executor = ledger.executor(member_signer);
        ledger.queries.beneficiary_view(&member).await.unwrap();

        let err = executor.withdraw().await.unwrap_err();
        assert!(reason(&err).contains("not your turn"));
        assert_eq!(ledger.mock.submission_count(), 0);
    }

    #[tokio::test]
    async fn test_withdraw_on_turn_submits() {
        let ledger = Ledger::new();
        let member_signer = signer(50);
        let member = member_signer.identity();

        let mut config = cycle_config(wallet(1));
        config.current_index = 2;
        let config_address = ledger.seed_cycle(&config);
        let mut account = beneficiary(config_address, member, 2);
        account.monthly_paid = true;
        ledger.seed_beneficiary(&account);

        let executor = ledger.executor(member_signer);
        ledger.queries.beneficiary_view(&member).await.unwrap();

        let confirmation = executor.withdraw().await.unwrap();
        assert_eq!(
            ledger.mock.submissions()[0].signature_b58().as_deref(),
            Some(confirmation.signature.as_str())
        );
    }

    #[tokio::test]
    async fn test_claim_waits_for_all_claims() {
        let ledger = Ledger::new();
        let admin = wallet(1);
        let member_signer = signer(50);
        let member = member_signer.identity();

        let mut config = cycle_config(admin);
        config.current_index = 5;
        config.claimable = true;
        config.claims_completed = 3;
        let config_address = ledger.seed_cycle(&config);
        ledger.seed_beneficiary(&beneficiary(config_address, member, 4));
        let executor = ledger.executor(member_signer);

        ledger.queries.beneficiary_view(&member).await.unwrap();
        let err = executor.claim_collateral().await.unwrap_err();
        assert_eq!(
            reason(&err),
            "Cannot claim collateral until the cycle is complete"
        );
        assert_eq!(ledger.mock.submission_count(), 0);

        config.claims_completed = 5;
        ledger.update_config(&config);
        ledger.queries.invalidate_all();
        ledger.queries.beneficiary_view(&member).await.unwrap();

        executor.claim_collateral().await.unwrap();
        assert_eq!(ledger.mock.submission_count(), 1);
    }

    #[tokio::test]
    async fn test_rejection_keeps_cached_views() {
        let ledger = Ledger::new();
        let member_signer = signer(50);
        let member = member_signer.identity();
        let config_address = ledger.seed_cycle(&cycle_config(wallet(1)));
        ledger.seed_beneficiary(&beneficiary(config_address, member, 0));
        let executor = ledger.executor(member_signer);

        ledger.queries.beneficiary_view(&member).await.unwrap();
        ledger
            .mock
            .reject_submissions(Some("Monthly contribution not paid"));

        let err = executor.deposit_monthly().await.unwrap_err();
        match &err {
            SyncError::Submission { reason, signature } => {
                assert_eq!(reason.as_deref(), Some("Monthly contribution not paid"));
                assert!(signature.is_some());
            }
            other => panic!("expected a submission error, got {other:?}"),
        }
        assert_eq!(err.user_message(), "Monthly contribution not paid");

        let key = QueryKey::new(QueryName::BeneficiaryView, member);
        assert_eq!(ledger.queries.snapshot(&key).status, QueryStatus::Success);
    }

    #[tokio::test]
    async fn test_initialize_new_cycle() {
        let ledger = Ledger::new();
        let admin_signer = signer(1);
        let admin = admin_signer.identity();
        let executor = ledger.executor(admin_signer);

        assert!(!ledger.queries.cycle_exists(&admin).await.unwrap());
        let args = InitializeArgs {
            collateral_amount: 1_000_000_000,
            monthly_payout: 100_000_000,
            payment_interval_days: 30,
            max_beneficiaries: 5,
            withdraw_percent: 10,
        };
        executor.initialize(args).await.unwrap();
        assert_eq!(ledger.mock.submission_count(), 1);

        // The cached "no cycle" answer is gone.
        let key = QueryKey::new(QueryName::CycleExists, admin);
        assert_eq!(ledger.queries.snapshot(&key).status, QueryStatus::Idle);
    }

    #[tokio::test]
    async fn test_punish_overdue_beneficiary() {
        let ledger = Ledger::new();
        let admin_signer = signer(1);
        let admin = admin_signer.identity();
        let config_address = ledger.seed_cycle(&cycle_config(admin));
        let mut late = beneficiary(config_address, wallet(100), 0);
        late.last_payment_ts -= 31 * SECONDS_PER_DAY;
        ledger.seed_beneficiary(&late);
        let executor = ledger.executor(admin_signer);
        ledger.queries.administrator_view(&admin).await.unwrap();

        executor.punish(&wallet(100)).await.unwrap();
        assert_eq!(ledger.mock.submission_count(), 1);

        let err = executor.punish(&wallet(222)).await.unwrap_err();
        assert_eq!(reason(&err), "Funds cycle data not loaded");
    }

    #[tokio::test]
    async fn test_same_transition_cannot_overlap() {
        let ledger = Ledger::gated();
        let admin_signer = signer(1);
        let admin = admin_signer.identity();
        let mut config = cycle_config(admin);
        config.current_index = 5;
        ledger.seed_cycle(&config);
        ledger.queries.administrator_view(&admin).await.unwrap();

        let executor = Arc::new(ledger.executor(admin_signer));
        ledger.gateway.set_submits_open(false);
        let first = {
            let executor = Arc::clone(&executor);
            tokio::spawn(async move { executor.enable_claiming().await })
        };
        while ledger.gateway.waiting() == 0 {
            tokio::task::yield_now().await;
        }

        let err = executor.enable_claiming().await.unwrap_err();
        assert!(reason(&err).contains("already in progress"));
        // A different transition is not blocked by the guard.
        let err = executor.exit().await.unwrap_err();
        assert_eq!(reason(&err), "Claiming is not enabled");

        ledger.gateway.set_submits_open(true);
        first.await.unwrap().unwrap();
        assert_eq!(ledger.mock.submission_count(), 1);
    }

    #[tokio::test]
    async fn test_sent_submission_outlives_its_caller() {
        let ledger = Ledger::gated();
        let admin_signer = signer(1);
        let admin = admin_signer.identity();
        let mut config = cycle_config(admin);
        config.current_index = 5;
        ledger.seed_cycle(&config);
        ledger.queries.administrator_view(&admin).await.unwrap();

        let executor = Arc::new(ledger.executor(admin_signer));
        ledger.gateway.set_submits_open(false);
        let caller = {
            let executor = Arc::clone(&executor);
            tokio::spawn(async move { executor.enable_claiming().await })
        };
        while ledger.gateway.waiting() == 0 {
            tokio::task::yield_now().await;
        }
        caller.abort();
        ledger.gateway.set_submits_open(true);

        tokio::time::timeout(Duration::from_secs(5), async {
            while ledger.mock.submission_count() == 0
                || ledger.queries.cached_administrator_view(&admin).is_some()
            {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("submission never completed");
    }

    #[tokio::test]
    async fn test_abandoned_caller_keeps_transition_guarded() {
        let ledger = Ledger::gated();
        let admin_signer = signer(1);
        let admin = admin_signer.identity();
        let mut config = cycle_config(admin);
        config.current_index = 5;
        ledger.seed_cycle(&config);
        ledger.queries.administrator_view(&admin).await.unwrap();

        let executor = Arc::new(ledger.executor(admin_signer));
        ledger.gateway.set_submits_open(false);
        let caller = {
            let executor = Arc::clone(&executor);
            tokio::spawn(async move { executor.enable_claiming().await })
        };
        while ledger.gateway.waiting() == 0 {
            tokio::task::yield_now().await;
        }
        caller.abort();
        assert!(caller.await.unwrap_err().is_cancelled());

        // The first request is still held at the gateway.
        let err = executor.enable_claiming().await.unwrap_err();
        assert!(reason(&err).contains("already in progress"));

        ledger.gateway.set_submits_open(true);
        tokio::time::timeout(Duration::from_secs(5), async {
            while ledger.queries.cached_administrator_view(&admin).is_some() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("submission never completed");
        assert_eq!(ledger.mock.submission_count(), 1);
    }

    #[tokio::test]
    async fn test_signer_failure_sends_nothing() {
        let ledger = Ledger::new();
        let admin = signer(1).identity();
        let mut config = cycle_config(admin);
        config.current_index = 5;
        ledger.seed_cycle(&config);
        ledger.queries.administrator_view(&admin).await.unwrap();

        let impostor = ImpostorSigner {
            claimed: admin,
            real: signer(2),
        };
        let executor = MutationExecutor::new(ledger.queries.clone(), Arc::new(impostor));

        let err = executor.enable_claiming().await.unwrap_err();
        assert!(matches!(err, SyncError::Signer(_)));
        assert_eq!(ledger.mock.submission_count(), 0);
        assert!(ledger.queries.cached_administrator_view(&admin).is_some());
    }
}
