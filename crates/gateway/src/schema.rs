//! Table names and the joins the gateway embeds.

use db::{Direction, Relation};

pub const AGENTS: &str = "agents";
pub const CLIENTS: &str = "clients";
pub const INVOICES: &str = "invoices";
pub const INVOICE_ITEMS: &str = "invoice_items";

/// `agent:agents(*)` via `invoices.agent_id`.
pub fn agent() -> Relation {
    Relation::to_one("agent", AGENTS, "agent_id")
}

/// `client:clients(*)` via `invoices.client_id`.
pub fn client() -> Relation {
    Relation::to_one("client", CLIENTS, "client_id")
}

/// `items:invoice_items(*)` via `invoice_items.invoice_id`, oldest line first.
pub fn items() -> Relation {
    Relation::to_many("items", INVOICE_ITEMS, "invoice_id")
        .order_by("created_at", Direction::Ascending)
}
