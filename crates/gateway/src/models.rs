//! Domain models for the invoicing gateway.
//!
//! Read models (`Agent`, `Client`, `Invoice`, `InvoiceItem`) mirror the rows
//! the store returns.  `New*` types are insert payloads without identity and
//! `*Patch` types carry only the fields an update should touch.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use db::Row;

use crate::GatewayError;

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// A member of staff who owns invoices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAgent {
    pub name: String,
    pub email: String,
    pub department: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

/// A customer being invoiced.  `email` is the natural dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

// ---------------------------------------------------------------------------
// Invoice status
// ---------------------------------------------------------------------------

/// Invoice status as stored.  Only `sent` and `paid` carry meaning for the
/// dashboard; anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InvoiceStatus {
    Sent,
    Paid,
    Other(String),
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sent => "sent",
            Self::Paid => "paid",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "sent" => Self::Sent,
            "paid" => Self::Paid,
            other => Self::Other(other.to_owned()),
        })
    }
}

impl From<String> for InvoiceStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "sent" => Self::Sent,
            "paid" => Self::Paid,
            _ => Self::Other(s),
        }
    }
}

impl From<InvoiceStatus> for String {
    fn from(status: InvoiceStatus) -> Self {
        match status {
            InvoiceStatus::Other(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Invoices
// ---------------------------------------------------------------------------

/// A persisted invoice row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub agent_id: Uuid,
    pub client_id: Uuid,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub status: InvoiceStatus,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An invoice with its related rows embedded.
///
/// `agent` and `client` are `None` when the reference dangles; `items` is
/// empty when the query did not ask for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    #[serde(default)]
    pub agent: Option<Agent>,
    #[serde(default)]
    pub client: Option<Client>,
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
}

/// Insert payload for an invoice.  Money fields are computed by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub agent_id: Uuid,
    pub client_id: Uuid,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub status: InvoiceStatus,
    pub due_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<InvoiceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Invoice items
// ---------------------------------------------------------------------------

/// One line of an invoice.  Lines read back oldest `created_at` first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoiceItem {
    pub invoice_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
}

impl NewInvoiceItem {
    /// Line with `total = quantity * unit_price`.
    pub fn new(
        invoice_id: Uuid,
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Self {
        Self {
            invoice_id,
            description: description.into(),
            quantity,
            unit_price,
            total: quantity * unit_price,
        }
    }
}

/// Drops the identity so an existing line can be re-inserted.
impl From<InvoiceItem> for NewInvoiceItem {
    fn from(item: InvoiceItem) -> Self {
        Self {
            invoice_id: item.invoice_id,
            description: item.description,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total: item.total,
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Aggregate counters shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_invoices: usize,
    /// Sum of `total` over paid invoices.
    pub total_revenue: Decimal,
    /// Invoices with status `sent`.
    pub pending_invoices: usize,
    pub paid_invoices: usize,
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

pub(crate) fn to_row<T: Serialize>(value: &T) -> Result<Row, GatewayError> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        _ => Err(GatewayError::Decode(<serde_json::Error as serde::ser::Error>::custom(
            "payload does not serialise to an object",
        ))),
    }
}

pub(crate) fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, GatewayError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

pub(crate) fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, GatewayError> {
    rows.into_iter().map(from_row).collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    #[test]
    fn status_round_trips_unknown_values() {
        let status: InvoiceStatus = serde_json::from_value(json!("overdue")).unwrap();
        assert_eq!(status, InvoiceStatus::Other("overdue".into()));
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("overdue"));
        assert_eq!("paid".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Paid);
    }

    #[test]
    fn patch_serialises_only_supplied_fields() {
        let patch = InvoicePatch {
            status: Some(InvoiceStatus::Paid),
            ..Default::default()
        };
        assert_eq!(to_row(&patch).unwrap().len(), 1);
    }

    #[test]
    fn detail_accepts_numeric_money_and_missing_items() {
        let detail: InvoiceDetail = serde_json::from_value(json!({
            "id": "4f1c2a52-94d1-4c4b-8f7a-0b6c6d1f0e01",
            "invoice_number": "INV-001",
            "agent_id": "4f1c2a52-94d1-4c4b-8f7a-0b6c6d1f0e02",
            "client_id": "4f1c2a52-94d1-4c4b-8f7a-0b6c6d1f0e03",
            "subtotal": 100,
            "tax": "10.50",
            "total": 110.5,
            "status": "sent",
            "due_date": "2026-11-01",
            "notes": null,
            "created_at": "2026-10-19T09:30:00.123456+00:00",
            "agent": null,
            "client": null
        }))
        .unwrap();

        assert_eq!(detail.invoice.total, dec!(110.5));
        assert_eq!(detail.invoice.tax, dec!(10.50));
        assert!(detail.agent.is_none());
        assert!(detail.items.is_empty());
    }

    #[test]
    fn new_item_computes_line_total() {
        let item = NewInvoiceItem::new(Uuid::nil(), "Consulting", dec!(2.5), dec!(80));
        assert_eq!(item.total, dec!(200));
    }
}
