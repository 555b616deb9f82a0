//! # Unreliable Ledger
//!
//! Retries, dependent-step failures, partial scans and role resolution.

#[cfg(test)]
mod tests {
    use fc_ledger_sync::{
        encode, CycleQueryApi, QueryKey, QueryName, QueryStatus, Role, SyncError,
    };

    use crate::integration::fixtures::{
        beneficiary, cycle_config, seed_cycle_with_beneficiaries, wallet, Ledger,
    };

    #[tokio::test]
    async fn test_one_corrupt_beneficiary_of_five_is_dropped() {
        let ledger = Ledger::new();
        let admin = wallet(1);
        let config_address = seed_cycle_with_beneficiaries(&ledger, admin, 5);

        // Valid tag and size, but the `active` flag byte is neither 0 nor 1.
        let corrupt = beneficiary(config_address, wallet(102), 2);
        let (corrupt_address, _) = ledger
            .deriver
            .beneficiary_address(&config_address, &corrupt.wallet)
            .unwrap();
        let mut bytes = encode(&corrupt).unwrap();
        let len = bytes.len();
        bytes[len - 2] = 7;
        ledger.mock.put_raw(corrupt_address, bytes);

        let entries = ledger.queries.beneficiary_list(&config_address).await.unwrap();
        let indices: Vec<u8> = entries.iter().map(|e| e.account.index).collect();
        assert_eq!(indices, vec![0, 1, 3, 4]);
        assert!(entries.iter().all(|e| e.address != corrupt_address));
    }

    #[tokio::test]
    async fn test_list_excludes_other_cycles() {
        let ledger = Ledger::new();
        let ours = seed_cycle_with_beneficiaries(&ledger, wallet(1), 2);
        let theirs = ledger.seed_cycle(&cycle_config(wallet(2)));
        ledger.seed_beneficiary(&beneficiary(theirs, wallet(150), 0));

        let entries = ledger.queries.beneficiary_list(&ours).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.account.config == ours));
    }

    #[tokio::test]
    async fn test_transient_failures_retried_twice() {
        let ledger = Ledger::new();
        let admin = wallet(1);
        ledger.seed_cycle(&cycle_config(admin));
        let key = QueryKey::new(QueryName::AdministratorView, admin);

        ledger.mock.fail_next_reads(2);
        assert!(ledger.queries.administrator_view(&admin).await.is_ok());
        assert_eq!(ledger.queries.snapshot(&key).attempts, 3);
    }

    #[tokio::test]
    async fn test_third_failure_surfaces() {
        let ledger = Ledger::new();
        let admin = wallet(1);
        ledger.seed_cycle(&cycle_config(admin));
        let key = QueryKey::new(QueryName::AdministratorView, admin);

        ledger.mock.fail_next_reads(3);
        let err = ledger.queries.administrator_view(&admin).await.unwrap_err();
        assert!(matches!(err, SyncError::Gateway { .. }));
        assert_eq!(err.user_message(), "Network error, please retry");

        let snapshot = ledger.queries.snapshot(&key);
        assert_eq!(snapshot.status, QueryStatus::Error);
        assert_eq!(snapshot.attempts, 3);
        assert!(snapshot.value.is_none());

        // A failure is not served from cache.
        assert!(ledger.queries.administrator_view(&admin).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_vault_is_stale_data() {
        let ledger = Ledger::new();
        let admin = wallet(1);
        let config_address = ledger.seed_cycle(&cycle_config(admin));
        let (vault_address, _) = ledger.deriver.vault_address(&config_address).unwrap();
        ledger.mock.remove(&vault_address);

        let err = ledger.queries.administrator_view(&admin).await.unwrap_err();
        match &err {
            SyncError::StaleData { step, source } => {
                assert_eq!(*step, "vault");
                assert!(source.is_not_found());
            }
            other => panic!("expected stale data, got {other:?}"),
        }
        // Absence is not transient; one attempt only.
        let key = QueryKey::new(QueryName::AdministratorView, admin);
        assert_eq!(ledger.queries.snapshot(&key).attempts, 1);
    }

    #[tokio::test]
    async fn test_beneficiary_of_vanished_cycle_is_stale_data() {
        let ledger = Ledger::new();
        let member = wallet(100);
        let config_address = ledger.config_address(&wallet(1));
        ledger.seed_beneficiary(&beneficiary(config_address, member, 0));

        let err = ledger.queries.beneficiary_view(&member).await.unwrap_err();
        assert!(matches!(err, SyncError::StaleData { step: "cycle", .. }));
    }

    #[tokio::test]
    async fn test_unknown_wallet_is_not_found() {
        let ledger = Ledger::new();
        seed_cycle_with_beneficiaries(&ledger, wallet(1), 2);

        let err = ledger.queries.beneficiary_view(&wallet(250)).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.user_message(), "No beneficiary found");
    }

    #[tokio::test]
    async fn test_wallet_in_two_cycles_picks_lowest_address() {
        let ledger = Ledger::new();
        let member = wallet(100);
        let first = ledger.seed_cycle(&cycle_config(wallet(1)));
        let second = ledger.seed_cycle(&cycle_config(wallet(2)));
        let a = ledger.seed_beneficiary(&beneficiary(first, member, 0));
        let b = ledger.seed_beneficiary(&beneficiary(second, member, 1));

        let view = ledger.queries.beneficiary_view(&member).await.unwrap();
        assert_eq!(view.beneficiary_address, a.min(b));
    }

    #[tokio::test]
    async fn test_administrator_listed_in_own_cycle_is_administrator() {
        let ledger = Ledger::new();
        let admin = wallet(1);
        let config_address = seed_cycle_with_beneficiaries(&ledger, admin, 2);
        ledger.seed_beneficiary(&beneficiary(config_address, admin, 2));

        assert_eq!(ledger.queries.resolve_role(&admin).await, Role::Administrator);
    }

    #[tokio::test]
    async fn test_member_role_carries_index() {
        let ledger = Ledger::new();
        seed_cycle_with_beneficiaries(&ledger, wallet(1), 4);

        let role = ledger.queries.resolve_role(&wallet(103)).await;
        assert_eq!(role, Role::Beneficiary { index: 3 });
        // Idempotent: same answer from the cache.
        assert_eq!(ledger.queries.resolve_role(&wallet(103)).await, role);
    }

    #[tokio::test]
    async fn test_stranger_has_no_role() {
        let ledger = Ledger::new();
        seed_cycle_with_beneficiaries(&ledger, wallet(1), 3);

        assert_eq!(ledger.queries.resolve_role(&wallet(77)).await, Role::None);
    }

    #[tokio::test]
    async fn test_unreachable_ledger_resolves_to_no_role() {
        let ledger = Ledger::new();
        seed_cycle_with_beneficiaries(&ledger, wallet(1), 3);
        ledger.mock.fail_next_reads(100);

        assert_eq!(ledger.queries.resolve_role(&wallet(1)).await, Role::None);
    }
}
