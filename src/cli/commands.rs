pub(crate) use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;
use std::time::Duration;

use account_ledger::LedgerConfig;

#[derive(Parser, Debug)]
#[command(
    name = "account-ledger",
    author,
    version,
    about = "Account balances with atomic top-ups and transfers",
    long_about = None,
    after_help = "OUTPUT:\n    Results are printed to stdout in CSV format.\n    Use shell redirection to save to a file:\n\n    account-ledger export > accounts.csv"
)]
pub struct Args {
    /// SQLite database file
    #[arg(long, env = "LEDGER_DATABASE", default_value = "ledger.db", global = true)]
    pub database: PathBuf,

    /// Longest wait for a busy account before giving up, in milliseconds
    #[arg(long, env = "LEDGER_LOCK_TIMEOUT_MS", default_value_t = 5000, global = true)]
    pub lock_timeout_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn config(&self) -> LedgerConfig {
        LedgerConfig {
            database_path: self.database.clone(),
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            ..LedgerConfig::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database schema
    Init,

    /// Open a new account with a zero balance
    OpenAccount {
        #[arg(long)]
        name: String,
    },

    /// Credit an account
    TopUp {
        #[arg(long)]
        account: i64,
        /// Amount in minor units
        #[arg(long)]
        amount: i64,
        #[arg(long)]
        category: Option<i64>,
    },

    /// Move funds from the caller's account to another account
    Transfer {
        #[command(flatten)]
        auth: AuthArgs,
        #[arg(long)]
        to: i64,
        /// Amount in minor units
        #[arg(long)]
        amount: i64,
    },

    /// Print the caller's balance
    Balance {
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Print the caller's most recent ledger entries
    Mutation {
        #[command(flatten)]
        auth: AuthArgs,
        /// Earliest day to include (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<String>,
        /// Latest day to include (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<String>,
    },

    /// Apply top-ups and transfers from a CSV file
    Process {
        #[arg(
            index = 1,
            value_name = "FILE",
            help = "Input CSV file with columns: type, account, to, amount, category"
        )]
        input_file: PathBuf,
    },

    /// Print every account
    Export,

    /// Sign a bearer token for an account
    Token {
        #[arg(long)]
        account: i64,
        #[arg(long, default_value_t = 1)]
        auth_id: i64,
        #[arg(long)]
        username: Option<String>,
        #[arg(long, env = "LEDGER_SIGNING_KEY", hide_env_values = true)]
        signing_key: String,
    },
}

#[derive(clap::Args, Debug)]
pub struct AuthArgs {
    /// Bearer token identifying the caller
    #[arg(long, env = "LEDGER_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Secret the token was signed with
    #[arg(long, env = "LEDGER_SIGNING_KEY", hide_env_values = true)]
    pub signing_key: String,
}
