//! Postgres implementation of the ledger store.
//!
//! Each unit of work is one database transaction. Balance updates are a single
//! `UPDATE ... RETURNING`, so Postgres takes the row lock and holds it until the
//! transaction ends. `lock_timeout` is set per transaction; a wait that exceeds
//! it fails the statement instead of blocking forever.

use std::time::Duration;

use async_trait::async_trait;
use ledgerflow_core::{Account, Entry, LedgerStore, Transfer, TransferParams, UnitOfWork};
use ledgerflow_shared::LedgerConfig;
use ledgerflow_shared::types::AccountId;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr,
    EntityTrait, Set, Statement, TransactionTrait,
};

use crate::entities::{accounts, entries, transfers};

const ADD_ACCOUNT_BALANCE_SQL: &str = r"
UPDATE accounts
SET balance = balance + $1
WHERE id = $2
RETURNING id, owner, balance, currency, created_at
";

/// Ledger store backed by a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    db: DatabaseConnection,
    lock_timeout: Duration,
}

impl PgLedgerStore {
    /// Creates a store using the lock timeout from `config`.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &LedgerConfig) -> Self {
        Self::with_lock_timeout(db, Duration::from_millis(config.lock_timeout_ms))
    }

    /// Creates a store whose transactions give up on a row lock after `lock_timeout`.
    ///
    /// A zero timeout waits forever.
    #[must_use]
    pub const fn with_lock_timeout(db: DatabaseConnection, lock_timeout: Duration) -> Self {
        Self { db, lock_timeout }
    }

    /// Returns the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Error = DbErr;
    type Unit = PgUnitOfWork;

    async fn begin(&self) -> Result<PgUnitOfWork, DbErr> {
        let txn = self.db.begin().await?;
        // SET LOCAL is scoped to this transaction only.
        let sql = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis());
        txn.execute_unprepared(&sql).await?;
        Ok(PgUnitOfWork { txn })
    }

    async fn get_account(&self, id: AccountId) -> Result<Account, DbErr> {
        accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .map(Account::from)
            .ok_or_else(|| DbErr::RecordNotFound(format!("account {id}")))
    }
}

/// One open Postgres transaction.
///
/// Dropping it without committing rolls the transaction back.
pub struct PgUnitOfWork {
    txn: DatabaseTransaction,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    type Error = DbErr;

    async fn create_transfer(&mut self, params: &TransferParams) -> Result<Transfer, DbErr> {
        let model = transfers::ActiveModel {
            from_account_id: Set(params.from_account_id.into_inner()),
            to_account_id: Set(params.to_account_id.into_inner()),
            amount: Set(params.amount),
            ..Default::default()
        }
        .insert(&self.txn)
        .await?;
        Ok(model.into())
    }

    async fn create_entry(&mut self, account_id: AccountId, amount: i64) -> Result<Entry, DbErr> {
        let model = entries::ActiveModel {
            account_id: Set(account_id.into_inner()),
            amount: Set(amount),
            ..Default::default()
        }
        .insert(&self.txn)
        .await?;
        Ok(model.into())
    }

    async fn add_account_balance(
        &mut self,
        account_id: AccountId,
        delta: i64,
    ) -> Result<Account, DbErr> {
        let model = accounts::Entity::find()
            .from_raw_sql(Statement::from_sql_and_values(
                DbBackend::Postgres,
                ADD_ACCOUNT_BALANCE_SQL,
                [delta.into(), account_id.into_inner().into()],
            ))
            .one(&self.txn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("account {account_id}")))?;
        Ok(model.into())
    }

    async fn commit(self) -> Result<(), DbErr> {
        self.txn.commit().await
    }

    async fn rollback(self) -> Result<(), DbErr> {
        self.txn.rollback().await
    }
}

impl std::fmt::Debug for PgUnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgUnitOfWork").finish_non_exhaustive()
    }
}
