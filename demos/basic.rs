//! Basic example of using the `TransferEngine`.
//!
//! Run with: `cargo run --example basic`

use account_ledger::{BalanceQuery, Database, LedgerConfig, MutationQuery, TransferEngine};

fn main() {
    // Initialize logger (optional, but shows what's happening)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::temp_dir().join(format!("account-ledger-demo-{}.db", std::process::id()));
    let config = LedgerConfig {
        database_path: path.clone(),
        ..LedgerConfig::default()
    };
    let db = Database::open(&config).expect("Failed to open database");
    let engine = TransferEngine::new(db.clone());

    let alice = engine.accounts().create("alice").expect("Failed to open account");
    let bob = engine.accounts().create("bob").expect("Failed to open account");

    engine.top_up(alice.account_id(), 1000).expect("Top-up failed");
    engine.top_up(bob.account_id(), 500).expect("Top-up failed");
    engine
        .transfer(alice.account_id(), bob.account_id(), 300)
        .expect("Transfer failed");

    if let Err(e) = engine.transfer(alice.account_id(), bob.account_id(), 5000) {
        println!("Rejected as expected ({}): {e}", e.kind());
    }

    let balances = BalanceQuery::new(db.clone());
    println!("\n=== Balances ===");
    for account in [&alice, &bob] {
        println!(
            "{}: {}",
            account.name(),
            balances.balance(account.account_id()).expect("Balance failed")
        );
    }

    println!("\n=== Bob's mutations ===");
    for entry in MutationQuery::new(db)
        .mutation(bob.account_id(), None, None)
        .expect("Mutation failed")
    {
        println!("{entry:?}");
    }

    let _ = std::fs::remove_file(path);
}
