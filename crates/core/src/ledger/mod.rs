//! Double-entry transfer logic.
//!
//! This module implements the transfer engine:
//! - Domain types for accounts, entries, and transfers
//! - Store capability traits (unit of work)
//! - Canonical lock ordering for account pairs
//! - Balance mutation inside a unit of work
//! - The transfer executor
//! - An in-memory store with row locks for tests and demos

pub mod balance;
pub mod error;
pub mod executor;
pub mod lock_order;
pub mod memory;
pub mod store;
pub mod types;

#[cfg(test)]
mod executor_props;

pub use balance::add_balance;
pub use error::TransferError;
pub use executor::TransferExecutor;
pub use lock_order::{LockOrder, lock_order};
pub use memory::{InMemoryLedgerStore, MemoryStoreError, MemoryUnitOfWork, StoreOp};
pub use store::{LedgerStore, UnitOfWork};
pub use types::{Account, Entry, Transfer, TransferParams, TransferResult};
