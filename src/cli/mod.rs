use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::LedgerService;
use crate::domain::{format_cents, parse_cents, DEFAULT_INTEREST_RATE};

/// Tally - customer account ledger
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Customer accounts grouped under acronyms, with deposits, withdrawals and interest")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "LEDGER_DATABASE", default_value = "ledger.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Group management commands
    #[command(subcommand)]
    Group(GroupCommands),

    /// Customer management commands
    #[command(subcommand)]
    Customer(CustomerCommands),

    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(short, long, env = "LEDGER_BIND", default_value = "0.0.0.0:5000")]
        bind: String,
    },

    /// Credit interest to every customer
    Interest {
        /// Rate applied to each balance (0.025 = 2.5%)
        #[arg(short, long, default_value_t = DEFAULT_INTEREST_RATE)]
        rate: f64,
    },

    /// Show balance for a customer or all customers
    Balance {
        /// Customer ID (omit for all customers)
        customer: Option<String>,
    },

    /// Deposit into a customer's account
    Deposit {
        /// Customer ID
        customer: String,

        /// Amount to deposit (e.g., "50.00" or "50")
        amount: String,
    },

    /// Withdraw from a customer's account
    Withdraw {
        /// Customer ID
        customer: String,

        /// Amount to withdraw (e.g., "50.00" or "50")
        amount: String,
    },

    /// Verify stored balances against the transaction log
    Check,

    /// Export data to CSV
    Export {
        /// What to export: transactions, customers
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum GroupCommands {
    /// Create a new group
    Create {
        /// Group name (must be unique)
        name: String,

        /// 2 or 3 letter acronym, used as the ID prefix of its customers
        acronym: String,
    },

    /// List all groups
    List,
}

#[derive(Subcommand)]
pub enum CustomerCommands {
    /// Register a new customer
    Create {
        /// Customer name
        name: String,

        /// Email address (must be unique)
        email: String,

        /// Acronym of the group to register under
        #[arg(short, long)]
        group: Option<String>,
    },

    /// Show a customer and its transactions
    Show {
        /// Customer ID
        id: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Group(group_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_group_command(&service, group_cmd).await?;
            }

            Commands::Customer(customer_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_customer_command(&service, customer_cmd).await?;
            }

            Commands::Serve { bind } => {
                let service = LedgerService::init(&self.database).await?;
                crate::api::serve(Arc::new(service), &bind).await?;
            }

            Commands::Interest { rate } => {
                let service = LedgerService::connect(&self.database).await?;
                let count = service.apply_interest_all(rate).await?;
                println!("Interest of {}% credited to {} customer(s)", rate * 100.0, count);
            }

            Commands::Balance { customer } => {
                let service = LedgerService::connect(&self.database).await?;
                run_balance_command(&service, customer).await?;
            }

            Commands::Deposit { customer, amount } => {
                let amount_cents = parse_cents(&amount)
                    .with_context(|| format!("Invalid amount: {}", amount))?;
                let service = LedgerService::connect(&self.database).await?;
                let balance = service.deposit(&customer, amount_cents).await?;
                println!(
                    "Deposited {} to {}, new balance {}",
                    format_cents(amount_cents),
                    customer,
                    format_cents(balance)
                );
            }

            Commands::Withdraw { customer, amount } => {
                let amount_cents = parse_cents(&amount)
                    .with_context(|| format!("Invalid amount: {}", amount))?;
                let service = LedgerService::connect(&self.database).await?;
                let balance = service.withdraw(&customer, amount_cents).await?;
                println!(
                    "Withdrew {} from {}, new balance {}",
                    format_cents(amount_cents),
                    customer,
                    format_cents(balance)
                );
            }

            Commands::Check => {
                let service = LedgerService::connect(&self.database).await?;
                run_check_command(&service).await?;
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

async fn run_group_command(service: &LedgerService, cmd: GroupCommands) -> Result<()> {
    match cmd {
        GroupCommands::Create { name, acronym } => {
            let group = service.create_group(&name, &acronym).await?;
            println!("Created group: {} ({}), id {}", group.name, group.acronym, group.id);
        }

        GroupCommands::List => {
            let groups = service.list_groups().await?;
            if groups.is_empty() {
                println!("No groups found.");
            } else {
                println!("{:<6} {:<8} {:<30}", "ID", "ACRONYM", "NAME");
                println!("{}", "-".repeat(46));
                for group in groups {
                    println!("{:<6} {:<8} {:<30}", group.id, group.acronym, truncate(&group.name, 30));
                }
            }
        }
    }
    Ok(())
}

async fn run_customer_command(service: &LedgerService, cmd: CustomerCommands) -> Result<()> {
    match cmd {
        CustomerCommands::Create { name, email, group } => {
            let customer = service.create_customer(&name, &email, group.as_deref()).await?;
            println!("Created customer: {} ({})", customer.id, customer.name);
        }

        CustomerCommands::Show { id } => {
            let customer = service.get_customer(&id).await?;
            let transactions = service.list_transactions(&id).await?;

            println!("ID:      {}", customer.id);
            println!("Name:    {}", customer.name);
            println!("Email:   {}", customer.email);
            println!("Group:   {}", customer.group_label());
            println!("Balance: {}", format_cents(customer.balance));
            println!("Since:   {}", customer.created_at.format("%Y-%m-%d %H:%M"));
            println!();

            if transactions.is_empty() {
                println!("No transactions.");
            } else {
                println!("{:<8} {:<17} {:<10} {:>14}", "ID", "DATE", "KIND", "AMOUNT");
                println!("{}", "-".repeat(52));
                for t in transactions {
                    println!(
                        "{:<8} {:<17} {:<10} {:>14}",
                        t.id,
                        t.timestamp.format("%Y-%m-%d %H:%M"),
                        t.kind.as_str(),
                        format_cents(t.amount)
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_balance_command(service: &LedgerService, customer: Option<String>) -> Result<()> {
    match customer {
        Some(id) => {
            let customer = service.get_customer(&id).await?;
            println!("{}: {}", customer.id, format_cents(customer.balance));
        }
        None => {
            let customers = service.list_customers().await?;
            if customers.is_empty() {
                println!("No customers found.");
            } else {
                println!("{:<8} {:<24} {:<6} {:>12}", "ID", "NAME", "GROUP", "BALANCE");
                println!("{}", "-".repeat(53));
                for customer in customers {
                    println!(
                        "{:<8} {:<24} {:<6} {:>12}",
                        customer.id,
                        truncate(&customer.name, 24),
                        customer.group_label(),
                        format_cents(customer.balance)
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = service.check_integrity().await?;

    println!("Customers:    {}", report.customer_count);
    println!("Transactions: {}", report.transaction_count);
    println!("Total:        {}", format_cents(report.total_balance));
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in &report.issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
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
        "transactions" => {
            let count = exporter.export_transactions_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        "customers" => {
            let count = exporter.export_customers_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} customers", count);
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: transactions, customers",
                export_type
            );
        }
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
