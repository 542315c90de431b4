//! Balance mutation inside a unit of work.

use ledgerflow_shared::types::AccountId;

use super::lock_order::{LockOrder, lock_order};
use super::store::UnitOfWork;
use super::types::{Account, TransferParams};

/// Applies one signed delta to one account and returns the updated row.
///
/// No bounds check: balances may go negative. Overdraft policy, if any,
/// belongs to the caller.
pub async fn add_balance<U: UnitOfWork>(
    uow: &mut U,
    account_id: AccountId,
    delta: i64,
) -> Result<Account, U::Error> {
    let account = uow.add_account_balance(account_id, delta).await?;
    tracing::debug!(
        account_id = %account_id,
        delta,
        balance = account.balance,
        "Applied balance delta"
    );
    Ok(account)
}

/// Debits the source and credits the destination of a transfer, lower account id first.
///
/// Returns `(from_account, to_account)` regardless of the order the updates ran in.
/// Only reachable through the executor, after `check_preconditions` has ruled out
/// non-positive amounts, so negating `params.amount` cannot overflow.
pub(crate) async fn move_funds<U: UnitOfWork>(
    uow: &mut U,
    params: &TransferParams,
) -> Result<(Account, Account), U::Error> {
    let from = params.from_account_id;
    let to = params.to_account_id;
    let amount = params.amount;

    match lock_order(from, to) {
        LockOrder::FromFirst => {
            let from_account = add_balance(uow, from, -amount).await?;
            let to_account = add_balance(uow, to, amount).await?;
            Ok((from_account, to_account))
        }
        LockOrder::ToFirst => {
            let to_account = add_balance(uow, to, amount).await?;
            let from_account = add_balance(uow, from, -amount).await?;
            Ok((from_account, to_account))
        }
    }
}
