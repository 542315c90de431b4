//! Store capabilities the transfer engine needs.
//!
//! The engine never sees a connection or a query builder. A store hands out
//! units of work; every write of one transfer goes through a single unit, and
//! the unit either commits all of them or none.
//!
//! Implementations must serialize concurrent `add_account_balance` calls on the
//! same account (row lock held until commit or rollback). Dropping a unit
//! without committing must behave like `rollback`.

use async_trait::async_trait;
use ledgerflow_shared::types::AccountId;

use super::types::{Account, Entry, Transfer, TransferParams};

/// A transactional ledger store.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Store failure type, surfaced to callers unchanged.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Unit of work handed out by [`LedgerStore::begin`].
    type Unit: UnitOfWork<Error = Self::Error>;

    /// Opens a new unit of work.
    async fn begin(&self) -> Result<Self::Unit, Self::Error>;

    /// Reads the committed state of one account.
    async fn get_account(&self, id: AccountId) -> Result<Account, Self::Error>;
}

/// An open transactional scope.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Store failure type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Inserts a transfer row.
    async fn create_transfer(&mut self, params: &TransferParams) -> Result<Transfer, Self::Error>;

    /// Inserts one ledger entry.
    async fn create_entry(&mut self, account_id: AccountId, amount: i64)
    -> Result<Entry, Self::Error>;

    /// Adds `delta` to an account balance and returns the updated row.
    ///
    /// Locks the account row until the unit ends.
    async fn add_account_balance(
        &mut self,
        account_id: AccountId,
        delta: i64,
    ) -> Result<Account, Self::Error>;

    /// Makes every write of this unit durable and visible.
    async fn commit(self) -> Result<(), Self::Error>;

    /// Discards every write of this unit.
    async fn rollback(self) -> Result<(), Self::Error>;
}
