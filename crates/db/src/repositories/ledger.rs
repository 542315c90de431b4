//! Read access to committed entries and transfers.

use ledgerflow_core::{Entry, Transfer};
use ledgerflow_shared::types::{AccountId, EntryId, TransferId};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::entities::{entries, transfers};

/// Repository for ledger history.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Fetches one entry.
    pub async fn get_entry(&self, id: EntryId) -> Result<Option<Entry>, DbErr> {
        let model = entries::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?;
        Ok(model.map(Entry::from))
    }

    /// Lists entries posted against an account, oldest first.
    pub async fn list_entries(
        &self,
        account_id: AccountId,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Entry>, DbErr> {
        let models = entries::Entity::find()
            .filter(entries::Column::AccountId.eq(account_id.into_inner()))
            .order_by_asc(entries::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Entry::from).collect())
    }

    /// Fetches one transfer.
    pub async fn get_transfer(&self, id: TransferId) -> Result<Option<Transfer>, DbErr> {
        let model = transfers::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?;
        Ok(model.map(Transfer::from))
    }

    /// Lists transfers sent from `from` or received by `to`, oldest first.
    pub async fn list_transfers(
        &self,
        from: AccountId,
        to: AccountId,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Transfer>, DbErr> {
        let models = transfers::Entity::find()
            .filter(
                Condition::any()
                    .add(transfers::Column::FromAccountId.eq(from.into_inner()))
                    .add(transfers::Column::ToAccountId.eq(to.into_inner())),
            )
            .order_by_asc(transfers::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Transfer::from).collect())
    }

    /// Sum of all committed entry amounts for an account.
    ///
    /// For a reconciled account this equals its balance minus its opening balance.
    pub async fn entry_sum(&self, account_id: AccountId) -> Result<i64, DbErr> {
        // SUM(bigint) is NUMERIC in Postgres; cast back so it decodes as i64.
        let sum: Option<i64> = entries::Entity::find()
            .select_only()
            .column_as(Expr::cust("COALESCE(SUM(amount), 0)::BIGINT"), "total")
            .filter(entries::Column::AccountId.eq(account_id.into_inner()))
            .into_tuple()
            .one(&self.db)
            .await?;
        Ok(sum.unwrap_or(0))
    }
}
