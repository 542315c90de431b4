//! Database seeder for Ledgerflow development.
//!
//! Creates two demo accounts if they are missing and moves money between them
//! once, so a fresh database has a transfer, two entries and updated balances.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use ledgerflow_core::{Account, TransferExecutor};
use ledgerflow_db::{AccountRepository, CreateAccountInput, PgLedgerStore, connect};
use ledgerflow_shared::AppConfig;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const CURRENCY: &str = "USD";
const DEMO_ACCOUNTS: [(&str, i64); 2] = [("demo-alice", 100_000), ("demo-bob", 50_000)];
const DEMO_TRANSFER_AMOUNT: i64 = 2_500;

/// Filter used when `RUST_LOG` is unset. The bin target is `seeder`, not `ledgerflow_*`.
const DEFAULT_LOG_FILTER: &str = "seeder=info,ledgerflow=debug,sea_orm=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let accounts = AccountRepository::new(db.clone());

    let alice = ensure_account(&accounts, DEMO_ACCOUNTS[0]).await?;
    let bob = ensure_account(&accounts, DEMO_ACCOUNTS[1]).await?;

    let executor = TransferExecutor::new(PgLedgerStore::new(db, &config.ledger));
    let result = executor
        .execute_transfer(alice.id, bob.id, DEMO_TRANSFER_AMOUNT)
        .await
        .context("Demo transfer failed")?;

    info!(
        transfer_id = %result.transfer.id,
        from_balance = result.from_account.balance,
        to_balance = result.to_account.balance,
        "Seeding complete"
    );
    Ok(())
}

async fn ensure_account(
    repo: &AccountRepository,
    (owner, balance): (&str, i64),
) -> anyhow::Result<Account> {
    if let Some(account) = repo.find_by_owner_currency(owner, CURRENCY).await? {
        info!(account_id = %account.id, owner, "Demo account already exists");
        return Ok(account);
    }

    let account = repo
        .create_account(CreateAccountInput {
            owner: owner.to_string(),
            currency: CURRENCY.to_string(),
            balance,
        })
        .await?;
    info!(account_id = %account.id, owner, balance, "Created demo account");
    Ok(account)
}
