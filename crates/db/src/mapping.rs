//! Conversions from entity models to ledger domain types.

use chrono::{DateTime, Utc};
use ledgerflow_core::{Account, Entry, Transfer};
use ledgerflow_shared::types::{AccountId, EntryId, TransferId};

use crate::entities::{accounts, entries, transfers};

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: AccountId::new(model.id),
            owner: model.owner,
            balance: model.balance,
            currency: model.currency,
            created_at: DateTime::<Utc>::from(model.created_at),
        }
    }
}

impl From<entries::Model> for Entry {
    fn from(model: entries::Model) -> Self {
        Self {
            id: EntryId::new(model.id),
            account_id: AccountId::new(model.account_id),
            amount: model.amount,
            created_at: DateTime::<Utc>::from(model.created_at),
        }
    }
}

impl From<transfers::Model> for Transfer {
    fn from(model: transfers::Model) -> Self {
        Self {
            id: TransferId::new(model.id),
            from_account_id: AccountId::new(model.from_account_id),
            to_account_id: AccountId::new(model.to_account_id),
            amount: model.amount,
            created_at: DateTime::<Utc>::from(model.created_at),
        }
    }
}
