//! Transfer executor.
//!
//! Runs one fund transfer as a single unit of work:
//! 1. Check preconditions (positive amount, distinct accounts)
//! 2. Open a unit of work
//! 3. Insert the transfer row
//! 4. Insert the debit entry (`-amount` on the source)
//! 5. Insert the credit entry (`+amount` on the destination)
//! 6. Update both balances, lower account id first
//! 7. Commit, or roll back and return the original store error
//!
//! The executor keeps no state of its own. Concurrent transfers coordinate
//! only through the store's row locks, and the fixed update order keeps those
//! locks from forming a cycle. Nothing is retried here.

use ledgerflow_shared::types::AccountId;
use tracing::{info, warn};

use super::balance::move_funds;
use super::error::TransferError;
use super::store::{LedgerStore, UnitOfWork};
use super::types::{TransferParams, TransferResult};

/// Executes fund transfers against a ledger store.
#[derive(Debug, Clone)]
pub struct TransferExecutor<S> {
    store: S,
}

impl<S: LedgerStore> TransferExecutor<S> {
    /// Creates an executor over the given store.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Moves `amount` from one account to another.
    ///
    /// # Errors
    ///
    /// - [`TransferError::InvalidAmount`] / [`TransferError::SameAccount`] before
    ///   any store access
    /// - [`TransferError::Store`] with the store's own error if any write or the
    ///   commit fails; nothing is persisted in that case
    pub async fn execute_transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: i64,
    ) -> Result<TransferResult, TransferError<S::Error>> {
        self.execute(TransferParams::new(from, to, amount)).await
    }

    /// Executes a transfer described by `params`.
    ///
    /// Dropping the returned future before it completes drops the open unit of
    /// work, which the store treats as a rollback.
    #[tracing::instrument(
        skip_all,
        fields(
            from = %params.from_account_id,
            to = %params.to_account_id,
            amount = params.amount,
        )
    )]
    pub async fn execute(
        &self,
        params: TransferParams,
    ) -> Result<TransferResult, TransferError<S::Error>> {
        if let Err(err) = params.check_preconditions() {
            warn!(error = %err, "Transfer rejected");
            return Err(err);
        }

        let mut uow = self.store.begin().await.map_err(TransferError::Store)?;

        match write_transfer(&mut uow, &params).await {
            Ok(result) => {
                uow.commit().await.map_err(|err| {
                    warn!(error = %err, "Transfer commit failed");
                    TransferError::Store(err)
                })?;
                info!(
                    transfer_id = %result.transfer.id,
                    from_balance = result.from_account.balance,
                    to_balance = result.to_account.balance,
                    "Transfer committed"
                );
                Ok(result)
            }
            Err(err) => {
                if let Err(rollback_err) = uow.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                warn!(error = %err, "Transfer rolled back");
                Err(TransferError::Store(err))
            }
        }
    }
}

/// Performs every write of one transfer inside `uow`.
async fn write_transfer<U: UnitOfWork>(
    uow: &mut U,
    params: &TransferParams,
) -> Result<TransferResult, U::Error> {
    let transfer = uow.create_transfer(params).await?;
    let from_entry = uow
        .create_entry(params.from_account_id, -params.amount)
        .await?;
    let to_entry = uow.create_entry(params.to_account_id, params.amount).await?;
    let (from_account, to_account) = move_funds(uow, params).await?;

    Ok(TransferResult {
        transfer,
        from_account,
        to_account,
        from_entry,
        to_entry,
    })
}
