//! Repository abstractions for data access.
//!
//! Repositories cover reads and account administration. Transfers are written
//! only through [`crate::PgLedgerStore`].

pub mod account;
pub mod ledger;

pub use account::{AccountError, AccountRepository, CreateAccountInput};
pub use ledger::LedgerRepository;
