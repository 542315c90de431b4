//! Shared ids, errors, and configuration for Ledgerflow.
//!
//! This crate provides common types used across all other crates:
//! - Typed ids for accounts, entries, and transfers
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, LedgerConfig};
pub use error::{AppError, AppResult};
