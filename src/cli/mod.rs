use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::LedgerService;
use crate::domain::{format_cents, parse_cents, TransactionKind};

/// Passbook - minimal account ledger
#[derive(Parser)]
#[command(name = "passbook")]
#[command(about = "A minimal account-ledger: accounts, deposits, withdrawals")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "passbook.db")]
    pub database: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Record a deposit into an account
    Deposit {
        /// Account name
        account: String,

        /// Amount to deposit (e.g., "50.00" or "50")
        amount: String,
    },

    /// Record a withdrawal from an account
    Withdraw {
        /// Account name
        account: String,

        /// Amount to withdraw (e.g., "50.00" or "50")
        amount: String,
    },

    /// List transactions, newest last
    Transactions {
        /// Filter by account name
        #[arg(long)]
        account: Option<String>,
    },

    /// Show the accounts with the highest balances
    Top {
        /// Number of accounts to show
        #[arg(short, default_value = "5")]
        n: usize,
    },

    /// Verify that every balance matches its transaction history
    Check {
        /// Rewrite drifted balances from transaction history
        #[arg(long)]
        repair: bool,
    },

    /// Export data to CSV or JSON
    Export {
        /// What to export: accounts, transactions, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Add {
        /// Account name
        name: String,

        /// Account category, e.g. "checking" or "savings"
        #[arg(short = 't', long = "type")]
        account_type: String,
    },

    /// List all accounts
    List,

    /// Show detailed account information
    Show {
        /// Account name
        name: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Account(account_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_account_command(&service, account_cmd).await?;
            }

            Commands::Deposit { account, amount } => {
                let service = LedgerService::connect(&self.database).await?;
                run_transaction_command(&service, &account, &amount, TransactionKind::Deposit)
                    .await?;
            }

            Commands::Withdraw { account, amount } => {
                let service = LedgerService::connect(&self.database).await?;
                run_transaction_command(&service, &account, &amount, TransactionKind::Withdrawal)
                    .await?;
            }

            Commands::Transactions { account } => {
                let service = LedgerService::connect(&self.database).await?;
                run_transactions_command(&service, account.as_deref()).await?;
            }

            Commands::Top { n } => {
                let service = LedgerService::connect(&self.database).await?;
                run_top_command(&service, n).await?;
            }

            Commands::Check { repair } => {
                let service = LedgerService::connect(&self.database).await?;
                run_check_command(&service, repair).await?;
            }

            Commands::Export {
                export_type,
                output,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                run_export_command(&service, &export_type, output.as_deref()).await?;
            }
        }

        Ok(())
    }
}

async fn run_account_command(service: &LedgerService, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Add { name, account_type } => {
            let account = service.create_account(&name, &account_type).await?;
            println!("Created account: {} ({})", account.name, account.account_type);
            println!("  ID: {}", account.id);
        }

        AccountCommands::List => {
            let accounts = service.list_accounts().await?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<20} {:<12} {:>12}", "NAME", "TYPE", "BALANCE");
                println!("{}", "-".repeat(46));
                for account in accounts {
                    println!(
                        "{:<20} {:<12} {:>12}",
                        account.name,
                        account.account_type,
                        format_cents(account.balance)
                    );
                }
            }
        }

        AccountCommands::Show { name } => {
            let info = service.get_account_info(&name).await?;
            let account = &info.account;

            println!("Account: {}", account.name);
            println!("  ID:           {}", account.id);
            println!("  Type:         {}", account.account_type);
            println!("  Balance:      {}", format_cents(account.balance));
            println!(
                "  Created:      {}",
                account.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!("  Transactions: {}", info.transaction_count);
            if let Some(last) = info.last_activity {
                println!("  Last activity: {}", last.format("%Y-%m-%d %H:%M:%S"));
            }
        }
    }
    Ok(())
}

async fn run_transaction_command(
    service: &LedgerService,
    account_name: &str,
    amount: &str,
    kind: TransactionKind,
) -> Result<()> {
    let amount_cents =
        parse_cents(amount).context("Invalid amount format. Use '50.00' or '50'")?;

    let account = service.find_account(account_name).await?;
    let txn = service
        .apply_transaction(account.id, amount_cents, kind)
        .await?;

    let account = service.get_account(account.id).await?;
    println!(
        "Recorded {}: {} on {} (balance now {})",
        txn.kind,
        format_cents(txn.amount_cents),
        account.name,
        format_cents(account.balance)
    );
    Ok(())
}

async fn run_transactions_command(
    service: &LedgerService,
    account_name: Option<&str>,
) -> Result<()> {
    let account = match account_name {
        Some(name) => Some(service.find_account(name).await?),
        None => None,
    };

    let transactions = service
        .list_transactions(account.as_ref().map(|a| a.id))
        .await?;

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!(
        "{:<6} {:<36} {:<12} {:>12}",
        "SEQ", "ACCOUNT", "TYPE", "AMOUNT"
    );
    println!("{}", "-".repeat(70));
    for txn in transactions {
        let account_label = match &account {
            Some(account) => account.name.clone(),
            None => txn.account_id.to_string(),
        };
        println!(
            "{:<6} {:<36} {:<12} {:>12}",
            txn.sequence,
            account_label,
            txn.kind,
            format_cents(txn.amount_cents)
        );
    }
    Ok(())
}

async fn run_top_command(service: &LedgerService, n: usize) -> Result<()> {
    let accounts = service.top_accounts(Some(n)).await?;

    if accounts.is_empty() {
        println!("No accounts found.");
        return Ok(());
    }

    println!("Top {} accounts by balance:", accounts.len());
    for (i, account) in accounts.iter().enumerate() {
        println!(
            "  {}. {:<20} {:>12}",
            i + 1,
            account.name,
            format_cents(account.balance)
        );
    }
    Ok(())
}

async fn run_check_command(service: &LedgerService, repair: bool) -> Result<()> {
    if repair {
        let result = service.repair_balances().await?;
        print_report(&result.report);
        if result.repaired > 0 {
            println!("Repaired {} balance(s) from transaction history.", result.repaired);
        } else {
            println!("Nothing to repair.");
        }
        return Ok(());
    }

    let report = service.check_integrity().await?;
    print_report(&report);

    if report.is_clean() {
        println!("Ledger is consistent.");
    } else {
        anyhow::bail!("ledger integrity check failed");
    }
    Ok(())
}

fn print_report(report: &crate::domain::IntegrityReport) {
    println!(
        "Checked {} account(s), {} transaction(s).",
        report.account_count, report.transaction_count
    );

    for mismatch in &report.mismatches {
        println!(
            "  MISMATCH {}: stored {}, history says {}",
            mismatch.account_name,
            format_cents(mismatch.stored),
            format_cents(mismatch.computed)
        );
    }
    for id in &report.negative_balances {
        println!("  NEGATIVE balance on account {}", id);
    }
    for id in &report.dangling_transactions {
        println!("  DANGLING transaction referencing unknown account {}", id);
    }
}

async fn run_export_command(
    service: &LedgerService,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "accounts" => {
            let count = exporter.export_accounts_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} accounts", count);
            }
        }
        "transactions" => {
            let count = exporter.export_transactions_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported full ledger: {} accounts, {} transactions",
                    snapshot.accounts.len(),
                    snapshot.transactions.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: accounts, transactions, full",
                export_type
            );
        }
    }

    Ok(())
}
