//! In-memory ledger store.
//!
//! Behaves like a row-locking transactional database for the operations the
//! transfer engine uses:
//! - `add_account_balance` takes an exclusive lock on the account row and
//!   holds it until the unit of work ends
//! - writes are staged in the unit and published atomically on commit;
//!   rollback or drop discards them
//! - rows referencing an unknown account are rejected like a foreign key
//! - lock waits give up after a timeout, the way `lock_timeout` does
//!
//! Ids come from per-table sequences, so rolled-back units leave gaps.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use ledgerflow_shared::types::{AccountId, EntryId, TransferId};
use thiserror::Error;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use super::store::{LedgerStore, UnitOfWork};
use super::types::{Account, Entry, Transfer, TransferParams};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Store operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// Opening a unit of work.
    Begin,
    /// Inserting a transfer row.
    CreateTransfer,
    /// Inserting an entry row.
    CreateEntry,
    /// Updating an account balance.
    AddAccountBalance,
    /// Committing a unit of work.
    Commit,
}

/// Errors raised by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryStoreError {
    /// A row referenced an account that does not exist.
    #[error("violates foreign key constraint: account {0} does not exist")]
    AccountNotFound(AccountId),

    /// A transfer row failed a check constraint.
    #[error("violates check constraint {0}")]
    CheckViolation(&'static str),

    /// The account row could not be locked in time.
    #[error("lock timeout on account {account_id} after {timeout:?}")]
    LockTimeout {
        /// Account whose row lock was contended.
        account_id: AccountId,
        /// How long the unit waited.
        timeout: Duration,
    },

    /// A balance update left the `i64` range.
    #[error("balance out of range for account {0}")]
    BalanceOutOfRange(AccountId),

    /// A failure armed with [`InMemoryLedgerStore::fail_on`].
    #[error("injected fault in {0:?}")]
    InjectedFault(StoreOp),
}

#[derive(Debug, Default)]
struct LedgerState {
    accounts: BTreeMap<AccountId, Account>,
    entries: Vec<Entry>,
    transfers: Vec<Transfer>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<LedgerState>,
    row_locks: DashMap<AccountId, Arc<RowLock<()>>>,
    faults: Mutex<HashMap<StoreOp, usize>>,
    account_seq: AtomicI64,
    entry_seq: AtomicI64,
    transfer_seq: AtomicI64,
    lock_timeout: Duration,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_fault(&self, op: StoreOp) -> Result<(), MemoryStoreError> {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        match faults.get_mut(&op) {
            Some(0) => {
                faults.remove(&op);
                Err(MemoryStoreError::InjectedFault(op))
            }
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn account(&self, id: AccountId) -> Result<Account, MemoryStoreError> {
        self.state()
            .accounts
            .get(&id)
            .cloned()
            .ok_or(MemoryStoreError::AccountNotFound(id))
    }

    fn row_lock(&self, id: AccountId) -> Arc<RowLock<()>> {
        Arc::clone(self.row_locks.entry(id).or_default().value())
    }
}

/// Transactional in-memory ledger store. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct InMemoryLedgerStore {
    shared: Arc<Shared>,
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedgerStore {
    /// Creates an empty store with a five second lock timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Creates an empty store whose row-lock waits give up after `lock_timeout`.
    ///
    /// A zero timeout waits forever.
    #[must_use]
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(LedgerState::default()),
                row_locks: DashMap::new(),
                faults: Mutex::new(HashMap::new()),
                account_seq: AtomicI64::new(1),
                entry_seq: AtomicI64::new(1),
                transfer_seq: AtomicI64::new(1),
                lock_timeout,
            }),
        }
    }

    /// Creates an account with an opening balance.
    pub fn create_account(&self, owner: &str, currency: &str, balance: i64) -> Account {
        let account = Account {
            id: AccountId::new(self.shared.account_seq.fetch_add(1, Ordering::Relaxed)),
            owner: owner.to_string(),
            balance,
            currency: currency.to_string(),
            created_at: Utc::now(),
        };
        self.shared
            .state()
            .accounts
            .insert(account.id, account.clone());
        account
    }

    /// Lists an owner's accounts ordered by id, skipping `offset` rows.
    #[must_use]
    pub fn list_accounts(&self, owner: &str, limit: u64, offset: u64) -> Vec<Account> {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        self.shared
            .state()
            .accounts
            .values()
            .filter(|account| account.owner == owner)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Committed entries posted against an account, oldest first.
    #[must_use]
    pub fn entries_for(&self, account_id: AccountId) -> Vec<Entry> {
        self.shared
            .state()
            .entries
            .iter()
            .filter(|entry| entry.account_id == account_id)
            .cloned()
            .collect()
    }

    /// Sum of committed entry amounts for an account.
    #[must_use]
    pub fn entry_sum(&self, account_id: AccountId) -> i64 {
        self.entries_for(account_id).iter().map(|e| e.amount).sum()
    }

    /// All committed transfers, in commit order.
    #[must_use]
    pub fn transfers(&self) -> Vec<Transfer> {
        self.shared.state().transfers.clone()
    }

    /// All committed entries, in commit order.
    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        self.shared.state().entries.clone()
    }

    /// Makes the next call to `op` fail with [`MemoryStoreError::InjectedFault`].
    pub fn fail_on(&self, op: StoreOp) {
        self.fail_after(op, 0);
    }

    /// Lets `skip` calls to `op` through, then fails the one after.
    pub fn fail_after(&self, op: StoreOp, skip: usize) {
        self.shared
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(op, skip);
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    type Error = MemoryStoreError;
    type Unit = MemoryUnitOfWork;

    async fn begin(&self) -> Result<MemoryUnitOfWork, MemoryStoreError> {
        self.shared.check_fault(StoreOp::Begin)?;
        Ok(MemoryUnitOfWork {
            shared: Arc::clone(&self.shared),
            row_guards: HashMap::new(),
            balances: HashMap::new(),
            entries: Vec::new(),
            transfers: Vec::new(),
        })
    }

    async fn get_account(&self, id: AccountId) -> Result<Account, MemoryStoreError> {
        self.shared.account(id)
    }
}

/// Unit of work over an [`InMemoryLedgerStore`].
///
/// Dropping it releases its row locks and discards its writes.
#[derive(Debug)]
pub struct MemoryUnitOfWork {
    shared: Arc<Shared>,
    row_guards: HashMap<AccountId, OwnedMutexGuard<()>>,
    balances: HashMap<AccountId, i64>,
    entries: Vec<Entry>,
    transfers: Vec<Transfer>,
}

impl MemoryUnitOfWork {
    async fn lock_row(&mut self, account_id: AccountId) -> Result<(), MemoryStoreError> {
        if self.row_guards.contains_key(&account_id) {
            return Ok(());
        }

        let lock = self.shared.row_lock(account_id);
        let timeout = self.shared.lock_timeout;
        let guard = if timeout.is_zero() {
            lock.lock_owned().await
        } else {
            tokio::time::timeout(timeout, lock.lock_owned())
                .await
                .map_err(|_| {
                    tracing::debug!(account_id = %account_id, ?timeout, "Row lock wait timed out");
                    MemoryStoreError::LockTimeout {
                        account_id,
                        timeout,
                    }
                })?
        };
        self.row_guards.insert(account_id, guard);
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    type Error = MemoryStoreError;

    async fn create_transfer(
        &mut self,
        params: &TransferParams,
    ) -> Result<Transfer, MemoryStoreError> {
        self.shared.check_fault(StoreOp::CreateTransfer)?;
        if params.amount <= 0 {
            return Err(MemoryStoreError::CheckViolation("transfers_amount_positive"));
        }
        if params.from_account_id == params.to_account_id {
            return Err(MemoryStoreError::CheckViolation("transfers_distinct_accounts"));
        }
        self.shared.account(params.from_account_id)?;
        self.shared.account(params.to_account_id)?;

        let transfer = Transfer {
            id: TransferId::new(self.shared.transfer_seq.fetch_add(1, Ordering::Relaxed)),
            from_account_id: params.from_account_id,
            to_account_id: params.to_account_id,
            amount: params.amount,
            created_at: Utc::now(),
        };
        self.transfers.push(transfer.clone());
        Ok(transfer)
    }

    async fn create_entry(
        &mut self,
        account_id: AccountId,
        amount: i64,
    ) -> Result<Entry, MemoryStoreError> {
        self.shared.check_fault(StoreOp::CreateEntry)?;
        self.shared.account(account_id)?;

        let entry = Entry {
            id: EntryId::new(self.shared.entry_seq.fetch_add(1, Ordering::Relaxed)),
            account_id,
            amount,
            created_at: Utc::now(),
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }

    async fn add_account_balance(
        &mut self,
        account_id: AccountId,
        delta: i64,
    ) -> Result<Account, MemoryStoreError> {
        self.shared.check_fault(StoreOp::AddAccountBalance)?;
        self.shared.account(account_id)?;
        self.lock_row(account_id).await?;

        // Read after locking: the previous holder may have committed meanwhile.
        let mut account = self.shared.account(account_id)?;
        let current = self
            .balances
            .get(&account_id)
            .copied()
            .unwrap_or(account.balance);
        let updated = current
            .checked_add(delta)
            .ok_or(MemoryStoreError::BalanceOutOfRange(account_id))?;

        self.balances.insert(account_id, updated);
        account.balance = updated;
        Ok(account)
    }

    async fn commit(self) -> Result<(), MemoryStoreError> {
        self.shared.check_fault(StoreOp::Commit)?;

        let Self {
            shared,
            row_guards,
            balances,
            entries,
            transfers,
        } = self;

        {
            let mut state = shared.state();
            for (account_id, balance) in balances {
                if let Some(account) = state.accounts.get_mut(&account_id) {
                    account.balance = balance;
                }
            }
            state.transfers.extend(transfers);
            state.entries.extend(entries);
        }

        // Row locks are released only after the new balances are visible.
        drop(row_guards);
        Ok(())
    }

    async fn rollback(self) -> Result<(), MemoryStoreError> {
        Ok(())
    }
}
