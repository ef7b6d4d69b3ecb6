//! Invoice line-item operations.

use db::{Direction, Query};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::models::{from_rows, to_row, InvoiceItem, NewInvoiceItem};
use crate::schema::INVOICE_ITEMS;
use crate::{GatewayError, InvoicingGateway};

const CREATE_ITEMS: &str = "failed to create invoice items";

impl InvoicingGateway {
    /// Items currently owned by `invoice_id`, oldest first.
    #[instrument(skip(self))]
    pub async fn list_invoice_items(&self, invoice_id: Uuid) -> Result<Vec<InvoiceItem>, GatewayError> {
        let rows = self
            .store()
            .fetch_all(
                Query::select(INVOICE_ITEMS)
                    .eq("invoice_id", invoice_id.to_string())
                    .order_by("created_at", Direction::Ascending),
            )
            .await?;
        from_rows(rows)
    }

    /// Bulk insert.  An empty slice is a no-op.
    ///
    /// Store failures come back as [`GatewayError::Operation`] prefixed with
    /// `failed to create invoice items`.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn create_invoice_items(&self, items: &[NewInvoiceItem]) -> Result<Vec<InvoiceItem>, GatewayError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let rows = items.iter().map(to_row).collect::<Result<Vec<_>, _>>()?;
        let inserted = self
            .store()
            .fetch_all(Query::insert(INVOICE_ITEMS, rows))
            .await
            .map_err(GatewayError::wrap(CREATE_ITEMS))?;
        from_rows(inserted)
    }

    /// Replace every item of `invoice_id` with `items`.
    ///
    /// Deletes first, then inserts the new set with each line re-stamped to
    /// `invoice_id`.  The two steps are separate requests: if the insert
    /// fails the invoice is left with no items.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn replace_invoice_items(
        &self,
        invoice_id: Uuid,
        items: &[NewInvoiceItem],
    ) -> Result<Vec<InvoiceItem>, GatewayError> {
        let removed = self
            .store()
            .fetch_all(
                Query::delete(INVOICE_ITEMS)
                    .columns(&["id"])
                    .eq("invoice_id", invoice_id.to_string()),
            )
            .await?;
        debug!(removed = removed.len(), "old items deleted");

        let stamped: Vec<NewInvoiceItem> = items
            .iter()
            .cloned()
            .map(|item| NewInvoiceItem { invoice_id, ..item })
            .collect();

        self.create_invoice_items(&stamped).await.map_err(|e| {
            warn!(%invoice_id, error = %e, "replacement insert failed; invoice has no items");
            e
        })
    }
}
