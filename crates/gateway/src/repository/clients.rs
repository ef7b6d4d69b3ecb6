//! Client operations.

use db::{Direction, Query};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::models::{from_row, from_rows, to_row, Client, ClientPatch, NewClient};
use crate::schema::CLIENTS;
use crate::{GatewayError, InvoicingGateway};

impl InvoicingGateway {
    /// Return all clients ordered by name.
    #[instrument(skip(self))]
    pub async fn list_clients(&self) -> Result<Vec<Client>, GatewayError> {
        let rows = self
            .store()
            .fetch_all(Query::select(CLIENTS).order_by("name", Direction::Ascending))
            .await?;
        from_rows(rows)
    }

    #[instrument(skip(self, client), fields(email = %client.email))]
    pub async fn create_client(&self, client: &NewClient) -> Result<Client, GatewayError> {
        let row = self
            .store()
            .fetch_one(Query::insert(CLIENTS, vec![to_row(client)?]))
            .await?;
        from_row(row)
    }

    /// Look a client up by email.
    ///
    /// Email is not unique in the store; more than one match is reported as
    /// `DbError::MultipleRows`.
    #[instrument(skip(self))]
    pub async fn find_client_by_email(&self, email: &str) -> Result<Option<Client>, GatewayError> {
        self.store()
            .fetch_optional(Query::select(CLIENTS).eq("email", email))
            .await?
            .map(from_row)
            .transpose()
    }

    /// Return the client with `client.email`, creating it when absent.
    ///
    /// An existing record is returned as stored; the other supplied fields
    /// are not written back.  Lookup and insert are separate requests, so two
    /// concurrent calls for a new email can both insert.
    #[instrument(skip(self, client), fields(email = %client.email))]
    pub async fn get_or_create_client(&self, client: &NewClient) -> Result<Client, GatewayError> {
        if let Some(existing) = self.find_client_by_email(&client.email).await? {
            if existing.name != client.name
                || existing.phone != client.phone
                || existing.address != client.address
            {
                debug!(id = %existing.id, "existing client differs from supplied fields; keeping stored values");
            }
            return Ok(existing);
        }
        self.create_client(client).await
    }

    /// Apply a partial update to one client.
    #[instrument(skip(self, patch))]
    pub async fn update_client(&self, id: Uuid, patch: &ClientPatch) -> Result<Client, GatewayError> {
        let patch = to_row(patch)?;
        let query = if patch.is_empty() {
            Query::select(CLIENTS).eq("id", id.to_string())
        } else {
            Query::update(CLIENTS, patch).eq("id", id.to_string())
        };
        let row = self.store().fetch_one(query).await?;
        from_row(row)
    }
}
