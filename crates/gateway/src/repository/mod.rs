//! Gateway operations — one method per store round trip (or short sequence).
//!
//! Every method takes `&self`, builds a [`db::Query`], runs it through the
//! injected store and decodes the rows.  No operation wraps several requests
//! in a transaction: the multi-step ones (`get_or_create_client`,
//! `create_invoice`, `replace_invoice_items`) can race or stop half way.

pub mod agents;
pub mod clients;
pub mod dashboard;
pub mod invoice_items;
pub mod invoices;
