//! Fund-transfer engine for Ledgerflow.
//!
//! This crate contains the transfer logic with ZERO web or database dependencies.
//! Storage is reached through the capability traits in [`ledger::store`], so the
//! same executor runs against Postgres (`ledgerflow-db`) or the in-memory store.
//!
//! # Modules
//!
//! - `ledger` - Accounts, entries, transfers, and the transfer executor

pub mod ledger;

pub use ledger::{
    Account, Entry, InMemoryLedgerStore, LedgerStore, Transfer, TransferError, TransferExecutor,
    TransferParams, TransferResult, UnitOfWork,
};
