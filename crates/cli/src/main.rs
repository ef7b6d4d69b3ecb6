//! `invoicing` CLI entry-point.
//!
//! Reads `STORE_URL` / `STORE_API_KEY` (optionally from `.env`) and runs one
//! gateway operation per invocation, printing the result as JSON.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use gateway::{InvoicePatch, InvoiceStatus, InvoicingGateway, NewAgent};

#[derive(Parser)]
#[command(
    name = "invoicing",
    about = "Query and maintain invoicing data in the hosted store",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List agents ordered by name.
    Agents,
    /// Create an agent.
    CreateAgent {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        department: String,
    },
    /// List clients ordered by name.
    Clients,
    /// List invoices, newest first.
    Invoices {
        /// Only invoices owned by this agent.
        #[arg(long)]
        agent: Option<Uuid>,
    },
    /// Show one invoice with its agent, client and items.
    Invoice { id: Uuid },
    /// Change an invoice's status (e.g. `sent`, `paid`).
    SetStatus { id: Uuid, status: String },
    /// Delete an invoice.
    DeleteInvoice { id: Uuid },
    /// Dashboard counters and paid revenue.
    Stats {
        #[arg(long)]
        agent: Option<Uuid>,
    },
    /// Invoices created today (local time).
    Today {
        #[arg(long)]
        agent: Option<Uuid>,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let gateway = InvoicingGateway::from_env().context("cannot start invoicing gateway")?;

    match cli.command {
        Command::Agents => print_json(&gateway.list_agents().await?)?,
        Command::CreateAgent { name, email, department } => {
            let agent = gateway
                .create_agent(&NewAgent { name, email, department })
                .await?;
            info!(id = %agent.id, "agent created");
            print_json(&agent)?;
        }
        Command::Clients => print_json(&gateway.list_clients().await?)?,
        Command::Invoices { agent } => print_json(&gateway.list_invoices(agent).await?)?,
        Command::Invoice { id } => print_json(&gateway.get_invoice(id).await?)?,
        Command::SetStatus { id, status } => {
            let patch = InvoicePatch {
                status: Some(InvoiceStatus::from(status)),
                ..Default::default()
            };
            print_json(&gateway.update_invoice(id, &patch).await?)?;
        }
        Command::DeleteInvoice { id } => {
            gateway
                .delete_invoice(id)
                .await
                .with_context(|| format!("cannot delete invoice {id}"))?;
            println!("deleted {id}");
        }
        Command::Stats { agent } => print_json(&gateway.get_stats(agent).await?)?,
        Command::Today { agent } => print_json(&gateway.get_todays_invoices(agent).await?)?,
    }

    Ok(())
}
