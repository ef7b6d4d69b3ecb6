//! `gateway` crate — the invoicing data gateway.
//!
//! Translates named operations on agents, clients, invoices, invoice items
//! and the dashboard into queries against an injected [`db::QueryStore`],
//! decoding rows into the typed models of [`models`].

pub mod error;
pub mod gateway;
pub mod models;
pub mod repository;
pub mod schema;

pub use error::GatewayError;
pub use gateway::InvoicingGateway;
pub use models::{
    Agent, AgentPatch, Client, ClientPatch, DashboardStats, Invoice, InvoiceDetail, InvoiceItem,
    InvoicePatch, InvoiceStatus, NewAgent, NewClient, NewInvoice, NewInvoiceItem,
};
