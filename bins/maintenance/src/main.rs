//! Operator maintenance commands for Tally.
//!
//! Usage:
//!   tally-maintenance rebuild-inventory [--customer <UUID>] [--quality-type <Q>]
//!                                       [--clear] [--reapply-expenses]
//!   tally-maintenance balance --customer <UUID>

use anyhow::Context;
use clap::{Parser, Subcommand};
use tally_core::inventory::{RebuildOptions, RebuildScope};
use tally_db::{InventoryRepository, LedgerRepository, connect_with};
use tally_shared::AppConfig;
use tally_shared::config::LoggingConfig;
use tally_shared::types::CustomerId;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tally-maintenance")]
#[command(about = "Maintenance commands for the Tally ledger")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompute inventory positions from stock transactions
    RebuildInventory {
        /// Only rebuild this customer
        #[arg(long, value_name = "UUID")]
        customer: Option<CustomerId>,

        /// Only rebuild this quality type
        #[arg(long)]
        quality_type: Option<String>,

        /// Delete positions and expense records in scope first
        #[arg(long)]
        clear: bool,

        /// Replay stored expense records on the rebuilt positions
        #[arg(long)]
        reapply_expenses: bool,
    },

    /// Print a customer's balance summary
    Balance {
        /// Customer to report on
        #[arg(long, value_name = "UUID")]
        customer: CustomerId,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    let db = connect_with(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    match cli.command {
        Commands::RebuildInventory {
            customer,
            quality_type,
            clear,
            reapply_expenses,
        } => {
            let repo = InventoryRepository::new(db, config.ledger);
            let report = repo
                .rebuild(
                    RebuildScope {
                        customer_id: customer,
                        quality_type,
                    },
                    RebuildOptions {
                        clear,
                        reapply_expenses,
                    },
                )
                .await?;

            if clear {
                println!(
                    "Cleared {} positions and {} expense records",
                    report.cleared_positions, report.cleared_expenses
                );
            } else if report.cleared_expenses > 0 {
                println!("Cleared {} expense records", report.cleared_expenses);
            }
            println!(
                "Created {} positions, updated {} positions",
                report.created, report.updated
            );
            if reapply_expenses {
                println!(
                    "Reapplied {} expenses, skipped {}",
                    report.applied,
                    report.skipped.len()
                );
                for skipped in &report.skipped {
                    println!(
                        "  skipped {} ({} / {}): {}",
                        skipped.record_id, skipped.customer_id, skipped.quality_type, skipped.reason
                    );
                }
            }
        }
        Commands::Balance { customer } => {
            let repo = LedgerRepository::new(db, config.ledger);
            let balance = repo.get_customer_balance(customer).await?;

            println!("Total pending: {}", balance.total_pending);
            println!("Total paid:    {}", balance.total_paid);
            println!("Net balance:   {}", balance.net_balance);
            if balance.is_advance {
                println!("Advance:       {}", balance.advance_amount);
            }
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over the configured filter.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebuild_flags_parse() {
        let id = CustomerId::new();
        let cli = Cli::try_parse_from([
            "tally-maintenance",
            "rebuild-inventory",
            "--customer",
            &id.to_string(),
            "--quality-type",
            "Grade A",
            "--clear",
            "--reapply-expenses",
        ])
        .unwrap();

        match cli.command {
            Commands::RebuildInventory {
                customer,
                quality_type,
                clear,
                reapply_expenses,
            } => {
                assert_eq!(customer, Some(id));
                assert_eq!(quality_type.as_deref(), Some("Grade A"));
                assert!(clear && reapply_expenses);
            }
            Commands::Balance { .. } => panic!("expected rebuild-inventory"),
        }
    }

    #[test]
    fn test_balance_requires_customer() {
        assert!(Cli::try_parse_from(["tally-maintenance", "balance"]).is_err());
        assert!(Cli::try_parse_from(["tally-maintenance", "balance", "--customer", "nope"]).is_err());
    }
}
