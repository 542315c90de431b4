//! Domain types for accounts, ledger entries, and transfers.
//!
//! All amounts are signed integers in the account's minor currency unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledgerflow_shared::types::{AccountId, EntryId, TransferId};

use super::error::TransferError;

/// A monetary account.
///
/// Only `balance` ever changes after creation, and only inside a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account id.
    pub id: AccountId,
    /// Owner name.
    pub owner: String,
    /// Balance in minor units. May be negative.
    pub balance: i64,
    /// ISO currency code.
    pub currency: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// One signed balance change against one account. Immutable once committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Entry id.
    pub id: EntryId,
    /// Account the change applies to.
    pub account_id: AccountId,
    /// Signed delta in minor units.
    pub amount: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Record of funds moved from one account to another. Immutable once committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Transfer id.
    pub id: TransferId,
    /// Debited account.
    pub from_account_id: AccountId,
    /// Credited account.
    pub to_account_id: AccountId,
    /// Amount moved, always positive.
    pub amount: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Input for a single transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferParams {
    /// Account to debit.
    pub from_account_id: AccountId,
    /// Account to credit.
    pub to_account_id: AccountId,
    /// Amount to move, in minor units.
    pub amount: i64,
}

impl TransferParams {
    /// Creates transfer parameters.
    #[must_use]
    pub const fn new(from_account_id: AccountId, to_account_id: AccountId, amount: i64) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
        }
    }

    /// Checks the preconditions that hold for every transfer.
    ///
    /// Account existence is deliberately not checked here: the store rejects
    /// unknown accounts when the rows are written.
    pub fn check_preconditions<E>(&self) -> Result<(), TransferError<E>> {
        if self.amount <= 0 {
            return Err(TransferError::InvalidAmount(self.amount));
        }
        if self.from_account_id == self.to_account_id {
            return Err(TransferError::SameAccount(self.from_account_id));
        }
        Ok(())
    }
}

/// Everything one committed transfer produced.
///
/// `from_account` and `to_account` carry the balances after this transfer's
/// own deltas were applied, inside the same unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    /// The transfer record.
    pub transfer: Transfer,
    /// Debited account after the update.
    pub from_account: Account,
    /// Credited account after the update.
    pub to_account: Account,
    /// Debit entry (`-amount`).
    pub from_entry: Entry,
    /// Credit entry (`+amount`).
    pub to_entry: Entry,
}

impl TransferResult {
    /// Sum of both entry amounts. Zero for every well-formed transfer.
    #[must_use]
    pub const fn entry_sum(&self) -> i64 {
        self.from_entry.amount + self.to_entry.amount
    }
}
