//! Agent operations.

use db::{Direction, Query};
use tracing::instrument;
use uuid::Uuid;

use crate::models::{from_row, from_rows, to_row, Agent, AgentPatch, NewAgent};
use crate::schema::AGENTS;
use crate::{GatewayError, InvoicingGateway};

impl InvoicingGateway {
    /// Return all agents ordered by name.
    #[instrument(skip(self))]
    pub async fn list_agents(&self) -> Result<Vec<Agent>, GatewayError> {
        let rows = self
            .store()
            .fetch_all(Query::select(AGENTS).order_by("name", Direction::Ascending))
            .await?;
        from_rows(rows)
    }

    /// Insert one agent and return it with its generated identity.
    #[instrument(skip(self, agent), fields(email = %agent.email))]
    pub async fn create_agent(&self, agent: &NewAgent) -> Result<Agent, GatewayError> {
        let row = self
            .store()
            .fetch_one(Query::insert(AGENTS, vec![to_row(agent)?]))
            .await?;
        from_row(row)
    }

    /// Fetch exactly one agent.
    ///
    /// Fails with `DbError::NotFound` (or `MultipleRows`) wrapped in
    /// [`GatewayError::Store`] unless a single row matches.
    #[instrument(skip(self))]
    pub async fn get_agent_by_id(&self, id: Uuid) -> Result<Agent, GatewayError> {
        let row = self
            .store()
            .fetch_one(Query::select(AGENTS).eq("id", id.to_string()))
            .await?;
        from_row(row)
    }

    /// Apply a partial update to one agent.
    #[instrument(skip(self, patch))]
    pub async fn update_agent(&self, id: Uuid, patch: &AgentPatch) -> Result<Agent, GatewayError> {
        let patch = to_row(patch)?;
        let query = if patch.is_empty() {
            Query::select(AGENTS).eq("id", id.to_string())
        } else {
            Query::update(AGENTS, patch).eq("id", id.to_string())
        };
        let row = self.store().fetch_one(query).await?;
        from_row(row)
    }
}
