//! # Cache Consistency
//!
//! Mutate-then-invalidate, late writes, and cancelled queries.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fc_ledger_sync::{
        CycleMutationApi, CycleQueryApi, QueryKey, QueryName, QueryStatus, RequestSigner,
    };

    use crate::integration::fixtures::{
        beneficiary, cycle_config, seed_cycle_with_beneficiaries, signer, wallet, Ledger,
    };

    #[tokio::test]
    async fn test_mutation_invalidates_every_view() {
        let ledger = Ledger::new();
        let admin_signer = signer(1);
        let admin = admin_signer.identity();
        let mut config = cycle_config(admin);
        config.current_index = 5;
        let config_address = ledger.seed_cycle(&config);
        let member = wallet(100);
        ledger.seed_beneficiary(&beneficiary(config_address, member, 0));
        let executor = ledger.executor(admin_signer);

        let before = ledger.queries.administrator_view(&admin).await.unwrap();
        assert!(!before.config.claimable);
        ledger.queries.beneficiary_view(&member).await.unwrap();
        ledger.queries.beneficiary_list(&config_address).await.unwrap();
        assert!(ledger.queries.cycle_exists(&admin).await.unwrap());

        executor.enable_claiming().await.unwrap();
        // What the program does on acceptance.
        config.claimable = true;
        ledger.update_config(&config);

        let keys = [
            QueryKey::new(QueryName::AdministratorView, admin),
            QueryKey::new(QueryName::BeneficiaryView, member),
            QueryKey::new(QueryName::BeneficiaryList, config_address),
            QueryKey::new(QueryName::CycleExists, admin),
        ];
        for key in &keys {
            assert_eq!(ledger.queries.snapshot(key).status, QueryStatus::Idle, "{key}");
        }

        let after = ledger.queries.administrator_view(&admin).await.unwrap();
        assert!(after.config.claimable);
        let member_view = ledger.queries.beneficiary_view(&member).await.unwrap();
        assert!(member_view.cycle.config.claimable);

        let scans = ledger.mock.scan_calls();
        ledger.queries.beneficiary_list(&config_address).await.unwrap();
        assert_eq!(ledger.mock.scan_calls(), scans + 1);
    }

    #[tokio::test]
    async fn test_fetch_started_before_invalidation_is_not_cached() {
        let ledger = Ledger::gated();
        let admin = wallet(1);
        ledger.seed_cycle(&cycle_config(admin));

        ledger.gateway.set_reads_open(false);
        let queries = ledger.queries.clone();
        let task = tokio::spawn(async move { queries.administrator_view(&admin).await });
        while ledger.gateway.waiting() == 0 {
            tokio::task::yield_now().await;
        }

        ledger.queries.invalidate_all();
        ledger.gateway.set_reads_open(true);

        // The caller still gets its answer; the cache does not keep it.
        let view = task.await.unwrap().unwrap();
        assert_eq!(view.config.admin, admin);
        let key = QueryKey::new(QueryName::AdministratorView, admin);
        assert!(ledger.queries.cache().peek(&key).is_none());
        assert_eq!(ledger.queries.snapshot(&key).status, QueryStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_query_leaves_no_trace() {
        let ledger = Ledger::new();
        let admin = wallet(1);
        ledger.seed_cycle(&cycle_config(admin));

        ledger.mock.hang_reads(true);
        let outcome = tokio::time::timeout(
            Duration::from_secs(1),
            ledger.queries.administrator_view(&admin),
        )
        .await;
        assert!(outcome.is_err());

        let key = QueryKey::new(QueryName::AdministratorView, admin);
        assert!(!ledger.queries.cache().is_in_flight(&key));
        assert!(ledger.queries.cache().is_empty());
        assert_eq!(ledger.queries.snapshot(&key).status, QueryStatus::Idle);

        ledger.mock.hang_reads(false);
        assert!(ledger.queries.administrator_view(&admin).await.is_ok());
    }

    #[tokio::test]
    async fn test_independent_queries_interleave() {
        let ledger = Ledger::new();
        let admin = wallet(1);
        let config_address = seed_cycle_with_beneficiaries(&ledger, admin, 3);

        let (view, list) = tokio::join!(
            ledger.queries.administrator_view(&admin),
            ledger.queries.beneficiary_list(&config_address),
        );
        assert_eq!(view.unwrap().config_address, config_address);
        assert_eq!(list.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_fresh_hits_do_not_touch_the_ledger() {
        let ledger = Ledger::new();
        let admin = wallet(1);
        let config_address = seed_cycle_with_beneficiaries(&ledger, admin, 2);

        ledger.queries.administrator_view(&admin).await.unwrap();
        ledger.queries.beneficiary_list(&config_address).await.unwrap();
        let reads = ledger.mock.read_calls();

        for _ in 0..3 {
            ledger.queries.administrator_view(&admin).await.unwrap();
            ledger.queries.beneficiary_list(&config_address).await.unwrap();
        }
        assert_eq!(ledger.mock.read_calls(), reads);
    }
}
