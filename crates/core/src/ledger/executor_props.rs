//! Concurrency and property tests for TransferExecutor.
//!
//! - Conservation of money under concurrent transfers
//! - Zero-sum entry pairs
//! - No deadlock when transfers alternate direction
//! - Atomicity when the store fails mid-transfer
//! - Balances always equal opening balance plus posted entries

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use futures::future::join_all;
use ledgerflow_shared::types::AccountId;
use proptest::prelude::*;
use rstest::rstest;

use super::error::TransferError;
use super::executor::TransferExecutor;
use super::memory::{InMemoryLedgerStore, MemoryStoreError, StoreOp};
use super::store::{LedgerStore, UnitOfWork};
use super::types::Account;

fn setup(
    x_balance: i64,
    y_balance: i64,
) -> (TransferExecutor<InMemoryLedgerStore>, Account, Account) {
    let store = InMemoryLedgerStore::new();
    let x = store.create_account("xavier", "USD", x_balance);
    let y = store.create_account("yolanda", "USD", y_balance);
    (TransferExecutor::new(store), x, y)
}

async fn balance(executor: &TransferExecutor<InMemoryLedgerStore>, id: AccountId) -> i64 {
    executor.store().get_account(id).await.unwrap().balance
}

#[tokio::test]
async fn test_transfer_scenario() {
    let (executor, x, y) = setup(1_000, 500);

    let result = executor.execute_transfer(x.id, y.id, 200).await.unwrap();

    assert_eq!(result.transfer.amount, 200);
    assert_eq!(result.transfer.from_account_id, x.id);
    assert_eq!(result.transfer.to_account_id, y.id);
    assert_eq!(result.from_entry.account_id, x.id);
    assert_eq!(result.from_entry.amount, -200);
    assert_eq!(result.to_entry.account_id, y.id);
    assert_eq!(result.to_entry.amount, 200);
    assert_eq!(result.from_account.id, x.id);
    assert_eq!(result.from_account.balance, 800);
    assert_eq!(result.to_account.id, y.id);
    assert_eq!(result.to_account.balance, 700);
    assert_eq!(result.entry_sum(), 0);
}

#[tokio::test]
async fn test_reverse_direction_uses_same_mapping() {
    // Destination has the lower id, so its balance is updated first.
    let (executor, x, y) = setup(1_000, 500);

    let result = executor.execute_transfer(y.id, x.id, 200).await.unwrap();

    assert_eq!(result.from_account.id, y.id);
    assert_eq!(result.from_account.balance, 300);
    assert_eq!(result.to_account.id, x.id);
    assert_eq!(result.to_account.balance, 1_200);
}

#[tokio::test]
async fn test_read_back_matches_result() {
    let (executor, x, y) = setup(1_000, 500);

    let result = executor.execute_transfer(x.id, y.id, 125).await.unwrap();

    let from = executor.store().get_account(x.id).await.unwrap();
    let to = executor.store().get_account(y.id).await.unwrap();
    assert_eq!(from, result.from_account);
    assert_eq!(to, result.to_account);
    assert_eq!(executor.store().transfers(), vec![result.transfer]);
}

#[rstest]
#[case::zero_amount(0, false)]
#[case::negative_amount(-200, false)]
#[case::min_amount(i64::MIN, false)]
#[case::same_account(10, true)]
#[tokio::test]
async fn test_preconditions_rejected_before_store(#[case] amount: i64, #[case] same: bool) {
    let (executor, x, y) = setup(1_000, 500);
    let to = if same { x.id } else { y.id };
    // Armed but never reached: a rejected request must not open a unit of work.
    executor.store().fail_on(StoreOp::Begin);

    let err = executor.execute_transfer(x.id, to, amount).await.unwrap_err();

    assert!(err.is_precondition());
    assert!(matches!(
        executor.store().begin().await,
        Err(MemoryStoreError::InjectedFault(StoreOp::Begin))
    ));
    assert!(executor.store().transfers().is_empty());
}

#[tokio::test]
async fn test_min_amount_is_rejected_without_negating() {
    let (executor, x, y) = setup(1_000, 500);

    let err = executor.execute_transfer(x.id, y.id, i64::MIN).await.unwrap_err();

    assert!(matches!(err, TransferError::InvalidAmount(i64::MIN)));
    assert_eq!(balance(&executor, x.id).await, 1_000);
    assert_eq!(balance(&executor, y.id).await, 500);
}

#[tokio::test]
async fn test_overdraft_is_not_checked() {
    let (executor, x, y) = setup(100, 0);

    let result = executor.execute_transfer(x.id, y.id, 250).await.unwrap();

    assert_eq!(result.from_account.balance, -150);
    assert_eq!(result.to_account.balance, 250);
}

#[tokio::test]
async fn test_unknown_account_is_store_error() {
    let (executor, x, _) = setup(1_000, 500);
    let ghost = AccountId::new(404);

    let err = executor.execute_transfer(x.id, ghost, 10).await.unwrap_err();

    assert!(matches!(
        err,
        TransferError::Store(MemoryStoreError::AccountNotFound(id)) if id == ghost
    ));
    assert!(executor.store().transfers().is_empty());
    assert!(executor.store().entries().is_empty());
    assert_eq!(balance(&executor, x.id).await, 1_000);
}

#[rstest]
#[case::debit_entry(StoreOp::CreateEntry, 0)]
#[case::credit_entry(StoreOp::CreateEntry, 1)]
#[case::first_balance_update(StoreOp::AddAccountBalance, 0)]
#[case::second_balance_update(StoreOp::AddAccountBalance, 1)]
#[case::commit(StoreOp::Commit, 0)]
#[tokio::test]
async fn test_failure_mid_transfer_commits_nothing(#[case] op: StoreOp, #[case] skip: usize) {
    let (executor, x, y) = setup(1_000, 500);
    executor.store().fail_after(op, skip);

    let err = executor.execute_transfer(x.id, y.id, 200).await.unwrap_err();

    assert!(matches!(
        err,
        TransferError::Store(MemoryStoreError::InjectedFault(failed)) if failed == op
    ));
    assert!(executor.store().transfers().is_empty());
    assert!(executor.store().entries().is_empty());
    assert_eq!(balance(&executor, x.id).await, 1_000);
    assert_eq!(balance(&executor, y.id).await, 500);

    // Row locks were released: the next transfer goes through.
    let result = executor.execute_transfer(x.id, y.id, 200).await.unwrap();
    assert_eq!(result.from_account.balance, 800);
}

#[tokio::test]
async fn test_lock_timeout_is_not_retried() {
    let store = InMemoryLedgerStore::with_lock_timeout(Duration::from_millis(50));
    let x = store.create_account("xavier", "USD", 1_000);
    let y = store.create_account("yolanda", "USD", 500);
    let executor = TransferExecutor::new(store.clone());

    let mut holder = store.begin().await.unwrap();
    holder.add_account_balance(y.id, 0).await.unwrap();

    let err = executor.execute_transfer(x.id, y.id, 10).await.unwrap_err();
    assert!(matches!(
        err,
        TransferError::Store(MemoryStoreError::LockTimeout { account_id, .. }) if account_id == y.id
    ));
    holder.rollback().await.unwrap();

    assert!(store.transfers().is_empty());
    assert_eq!(store.get_account(x.id).await.unwrap().balance, 1_000);
}

#[tokio::test]
async fn test_cancelled_transfer_rolls_back() {
    let (executor, x, y) = setup(1_000, 500);

    let mut holder = executor.store().begin().await.unwrap();
    holder.add_account_balance(y.id, 0).await.unwrap();

    // x has the lower id and is updated before the call parks on y's row lock.
    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        executor.execute_transfer(x.id, y.id, 10),
    )
    .await;
    assert!(outcome.is_err());
    holder.rollback().await.unwrap();

    assert!(executor.store().transfers().is_empty());
    assert_eq!(balance(&executor, x.id).await, 1_000);

    let result = executor.execute_transfer(x.id, y.id, 10).await.unwrap();
    assert_eq!(result.from_account.balance, 990);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transfers_conserve_money() {
    let (executor, x, y) = setup(1_000, 500);
    let amount = 10;
    let n = 5;

    let handles: Vec<_> = (0..n)
        .map(|_| {
            let executor = executor.clone();
            tokio::spawn(async move { executor.execute_transfer(x.id, y.id, amount).await })
        })
        .collect();

    let mut seen = BTreeSet::new();
    for handle in join_all(handles).await {
        let result = handle.unwrap().unwrap();
        assert_eq!(result.entry_sum(), 0);

        let debited = x.balance - result.from_account.balance;
        let credited = result.to_account.balance - y.balance;
        assert_eq!(debited, credited);
        assert_eq!(debited % amount, 0);

        // Each transfer observes a distinct step of the serialized sequence.
        let k = debited / amount;
        assert!((1..=n).contains(&k));
        assert!(seen.insert(k), "two transfers observed step {k}");
    }

    assert_eq!(balance(&executor, x.id).await, x.balance - n * amount);
    assert_eq!(balance(&executor, y.id).await, y.balance + n * amount);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_alternating_directions_do_not_deadlock() {
    let (executor, x, y) = setup(1_000, 500);
    let amount = 10;

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let executor = executor.clone();
            let (from, to) = if i % 2 == 0 { (x.id, y.id) } else { (y.id, x.id) };
            tokio::spawn(async move { executor.execute_transfer(from, to, amount).await })
        })
        .collect();

    for handle in join_all(handles).await {
        handle.unwrap().unwrap();
    }

    assert_eq!(balance(&executor, x.id).await, x.balance);
    assert_eq!(balance(&executor, y.id).await, y.balance);
    assert_eq!(executor.store().transfers().len(), 10);
    assert_eq!(executor.store().entries().len(), 20);
}

/// Strategy for a batch of transfers between four accounts (indices 0..4).
fn transfer_batch() -> impl Strategy<Value = Vec<(usize, usize, i64)>> {
    prop::collection::vec(
        (0usize..4, 0usize..4, 1i64..=500).prop_filter("distinct accounts", |(a, b, _)| a != b),
        1..40,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_concurrent_batches_keep_ledger_consistent(
        batch in transfer_batch(),
        openings in prop::array::uniform4(-1_000i64..10_000),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        runtime.block_on(async {
            let store = InMemoryLedgerStore::new();
            let accounts: Vec<Account> = openings
                .iter()
                .map(|&opening| store.create_account("prop", "USD", opening))
                .collect();
            let executor = TransferExecutor::new(store.clone());

            let results = join_all(batch.iter().map(|&(from, to, amount)| {
                executor.execute_transfer(accounts[from].id, accounts[to].id, amount)
            }))
            .await;

            let mut expected: HashMap<AccountId, i64> =
                accounts.iter().map(|a| (a.id, a.balance)).collect();
            for (result, &(from, to, amount)) in results.into_iter().zip(&batch) {
                let result = result.unwrap();
                prop_assert_eq!(result.entry_sum(), 0);
                prop_assert_eq!(result.transfer.amount, amount);
                *expected.entry(accounts[from].id).or_default() -= amount;
                *expected.entry(accounts[to].id).or_default() += amount;
            }

            prop_assert_eq!(store.transfers().len(), batch.len());
            prop_assert_eq!(store.entries().len(), batch.len() * 2);

            let opening_total: i64 = openings.iter().sum();
            let mut final_total = 0;
            for account in &accounts {
                let now = store.get_account(account.id).await.unwrap().balance;
                prop_assert_eq!(now, expected[&account.id]);
                prop_assert_eq!(now, account.balance + store.entry_sum(account.id));
                final_total += now;
            }
            prop_assert_eq!(final_total, opening_total);
            Ok(())
        })?;
    }
}
