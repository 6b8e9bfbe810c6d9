mod commands;

use account_ledger::auth::DEFAULT_TOKEN_LIFETIME_HOURS;
use account_ledger::{
    AuthTokenValidator, BalanceQuery, Claims, Database, JwtValidator, LedgerEntry, MutationQuery,
    TransferEngine,
};
use anyhow::{Context, Result};
use chrono::TimeDelta;
use clap::Parser;
use commands::{Args, AuthArgs, Command};

fn main() -> Result<()> {
    // Parse the CLI arguments
    let args = Args::parse();

    // Initialize logger with default level of info (can be overridden with RUST_LOG)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = args.config();
    let db = Database::open(&config)
        .with_context(|| format!("Failed to open database: {}", config.database_path.display()))?;
    let engine = TransferEngine::new(db.clone());

    match args.command {
        Command::Init => {
            log::info!("Database initialized at {}", db.path().display());
        }
        Command::OpenAccount { name } => {
            let account = engine
                .accounts()
                .create(&name)
                .context("Failed to open account")?;
            write_csv([account])?;
        }
        Command::TopUp {
            account,
            amount,
            category,
        } => {
            let entry = match category {
                Some(category) => engine.top_up_with_category(account, amount, category),
                None => engine.top_up(account, amount),
            }
            .context("Top-up failed")?;
            write_csv([entry])?;
        }
        Command::Transfer { auth, to, amount } => {
            let caller = authenticate(&auth)?;
            let entry = engine
                .transfer(caller.account_id, to, amount)
                .context("Transfer failed")?;
            write_csv([entry])?;
        }
        Command::Balance { auth } => {
            let caller = authenticate(&auth)?;
            let balance = BalanceQuery::new(db)
                .balance(caller.account_id)
                .context("Failed to retrieve balance")?;
            println!("{balance}");
        }
        Command::Mutation {
            auth,
            start_date,
            end_date,
        } => {
            let caller = authenticate(&auth)?;
            let entries: Vec<LedgerEntry> = MutationQuery::new(db)
                .with_limit(config.mutation_limit)
                .mutation(
                    caller.account_id,
                    start_date.as_deref(),
                    end_date.as_deref(),
                )
                .context("Failed to retrieve mutations")?;
            write_csv(entries)?;
        }
        Command::Process { input_file } => {
            log::info!("Processing operations from {}", input_file.display());
            let file = std::fs::File::open(&input_file)
                .with_context(|| format!("Failed to open input file: {}", input_file.display()))?;
            let summary = engine
                .process_operations(file)
                .context("Failed to process operations")?;
            if summary.skipped > 0 {
                log::warn!(
                    "{} of {} rows in {} were skipped",
                    summary.skipped,
                    summary.applied + summary.skipped,
                    input_file.display()
                );
            }
        }
        Command::Export => {
            engine
                .accounts()
                .export_accounts(std::io::stdout())
                .context("Failed to export accounts to stdout")?;
        }
        Command::Token {
            account,
            auth_id,
            username,
            signing_key,
        } => {
            let token = JwtValidator::new(signing_key.as_bytes())
                .issue(
                    Claims {
                        account_id: account,
                        auth_id,
                    },
                    username.as_deref(),
                    TimeDelta::hours(DEFAULT_TOKEN_LIFETIME_HOURS),
                )
                .context("Failed to sign token")?;
            println!("{token}");
        }
    }

    Ok(())
}

fn authenticate(auth: &AuthArgs) -> Result<Claims> {
    JwtValidator::new(auth.signing_key.as_bytes())
        .validate(&auth.token)
        .context("Authentication failed")
}

fn write_csv<T: serde::Serialize>(rows: impl IntoIterator<Item = T>) -> Result<()> {
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    for row in rows {
        writer.serialize(row).context("Failed to write output")?;
    }
    writer.flush().context("Failed to flush output")?;
    Ok(())
}
