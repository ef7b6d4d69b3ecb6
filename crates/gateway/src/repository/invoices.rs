//! Invoice operations.

use db::{Direction, Query};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{from_row, from_rows, to_row, InvoiceDetail, InvoicePatch, NewInvoice};
use crate::schema::{self, INVOICES};
use crate::{GatewayError, InvoicingGateway};

const CREATE_INVOICE: &str = "failed to create invoice";

/// Invoices with agent, client and items embedded, newest first, optionally
/// scoped to one agent.
pub(crate) fn detail_query(agent_id: Option<Uuid>) -> Query {
    let query = Query::select(INVOICES)
        .embed(schema::agent())
        .embed(schema::client())
        .embed(schema::items())
        .order_by("created_at", Direction::Descending);
    match agent_id {
        Some(agent_id) => query.eq("agent_id", agent_id.to_string()),
        None => query,
    }
}

impl InvoicingGateway {
    /// Return invoices with their agent, client and items, newest first.
    ///
    /// `None` lists every agent's invoices; `Some(id)` only that agent's.
    #[instrument(skip(self))]
    pub async fn list_invoices(&self, agent_id: Option<Uuid>) -> Result<Vec<InvoiceDetail>, GatewayError> {
        let rows = self.store().fetch_all(detail_query(agent_id)).await?;
        from_rows(rows)
    }

    /// Fetch one invoice joined like [`list_invoices`](Self::list_invoices).
    #[instrument(skip(self))]
    pub async fn get_invoice(&self, id: Uuid) -> Result<InvoiceDetail, GatewayError> {
        let row = self
            .store()
            .fetch_one(detail_query(None).eq("id", id.to_string()))
            .await?;
        from_row(row)
    }

    /// Insert an invoice after checking that its agent exists.
    ///
    /// # Errors
    /// - [`GatewayError::DomainValidation`] if the agent does not exist; no
    ///   insert is attempted.
    /// - [`GatewayError::Operation`] for any store failure, prefixed with
    ///   `failed to create invoice`.
    #[instrument(skip(self, invoice), fields(number = %invoice.invoice_number, agent_id = %invoice.agent_id))]
    pub async fn create_invoice(&self, invoice: &NewInvoice) -> Result<InvoiceDetail, GatewayError> {
        match self.get_agent_by_id(invoice.agent_id).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                return Err(GatewayError::DomainValidation(format!(
                    "agent not found: {}",
                    invoice.agent_id
                )));
            }
            Err(GatewayError::Store(source)) => {
                return Err(GatewayError::Operation {
                    operation: CREATE_INVOICE,
                    source,
                });
            }
            Err(other) => return Err(other),
        }

        let query = Query::insert(INVOICES, vec![to_row(invoice)?])
            .embed(schema::agent())
            .embed(schema::client());
        let row = self
            .store()
            .fetch_one(query)
            .await
            .map_err(GatewayError::wrap(CREATE_INVOICE))?;

        let created: InvoiceDetail = from_row(row)?;
        info!(id = %created.invoice.id, "invoice created");
        Ok(created)
    }

    /// Apply a partial update and return the invoice with agent, client and
    /// items.  An empty patch only re-reads the invoice.
    #[instrument(skip(self, patch))]
    pub async fn update_invoice(&self, id: Uuid, patch: &InvoicePatch) -> Result<InvoiceDetail, GatewayError> {
        let patch = to_row(patch)?;
        if patch.is_empty() {
            return self.get_invoice(id).await;
        }

        let query = Query::update(INVOICES, patch)
            .embed(schema::agent())
            .embed(schema::client())
            .embed(schema::items())
            .eq("id", id.to_string());
        let row = self.store().fetch_one(query).await?;
        from_row(row)
    }

    /// Delete one invoice.  Its items are left to the store's cascade rules.
    ///
    /// Returns `DbError::NotFound` if no row was deleted.
    #[instrument(skip(self))]
    pub async fn delete_invoice(&self, id: Uuid) -> Result<(), GatewayError> {
        let removed = self
            .store()
            .fetch_all(Query::delete(INVOICES).columns(&["id"]).eq("id", id.to_string()))
            .await?;

        if removed.is_empty() {
            return Err(db::DbError::NotFound.into());
        }

        info!("invoice deleted");
        Ok(())
    }
}
