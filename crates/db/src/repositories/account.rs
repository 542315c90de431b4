//! Account repository.

use ledgerflow_core::Account;
use ledgerflow_shared::AppError;
use ledgerflow_shared::types::AccountId;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr,
};

use crate::entities::accounts;

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// The owner already has an account in this currency.
    #[error("Owner '{owner}' already has a {currency} account")]
    DuplicateCurrency {
        /// Account owner.
        owner: String,
        /// Currency code.
        currency: String,
    },

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::DuplicateCurrency { .. } => Self::Conflict(err.to_string()),
            AccountError::AccountNotFound(_) => Self::NotFound(err.to_string()),
            AccountError::Database(db) => Self::Database(db.to_string()),
        }
    }
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Owner name.
    pub owner: String,
    /// ISO currency code.
    pub currency: String,
    /// Opening balance in minor units.
    pub balance: i64,
}

/// Repository for account rows.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account with an opening balance.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::DuplicateCurrency`] if the owner already holds an
    /// account in that currency.
    pub async fn create_account(&self, input: CreateAccountInput) -> Result<Account, AccountError> {
        let CreateAccountInput {
            owner,
            currency,
            balance,
        } = input;

        let inserted = accounts::ActiveModel {
            owner: Set(owner.clone()),
            currency: Set(currency.clone()),
            balance: Set(balance),
            ..Default::default()
        }
        .insert(&self.db)
        .await;

        match inserted {
            Ok(model) => {
                tracing::debug!(account_id = model.id, %owner, %currency, "Account created");
                Ok(model.into())
            }
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(AccountError::DuplicateCurrency { owner, currency })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Fetches one account by id.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, AccountError> {
        accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .map(Account::from)
            .ok_or(AccountError::AccountNotFound(id))
    }

    /// Finds an owner's account in a given currency.
    pub async fn find_by_owner_currency(
        &self,
        owner: &str,
        currency: &str,
    ) -> Result<Option<Account>, AccountError> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::Owner.eq(owner))
            .filter(accounts::Column::Currency.eq(currency))
            .one(&self.db)
            .await?;
        Ok(model.map(Account::from))
    }

    /// Lists an owner's accounts ordered by id.
    pub async fn list_accounts(
        &self,
        owner: &str,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Account>, AccountError> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::Owner.eq(owner))
            .order_by_asc(accounts::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Account::from).collect())
    }
}
