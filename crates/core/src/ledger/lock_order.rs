//! Canonical lock ordering for account pairs.
//!
//! Two transfers touching the same accounts in opposite directions would lock
//! the rows in opposite orders and deadlock. Every transfer therefore mutates
//! the account with the lower id first, whichever side it is on.

use ledgerflow_shared::types::AccountId;

/// Which side of a transfer has its balance updated first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOrder {
    /// Debit the source account, then credit the destination.
    FromFirst,
    /// Credit the destination account, then debit the source.
    ToFirst,
}

/// Returns the balance-update order for a transfer from `from` to `to`.
///
/// Lower id first. Not configurable: every concurrent transfer must agree.
#[must_use]
pub const fn lock_order(from: AccountId, to: AccountId) -> LockOrder {
    if from.into_inner() < to.into_inner() {
        LockOrder::FromFirst
    } else {
        LockOrder::ToFirst
    }
}
