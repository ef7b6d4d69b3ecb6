//! The `InvoicingGateway` handle.
//!
//! Owns nothing but an injected [`QueryStore`].  Operations are grouped by
//! entity in the [`repository`](crate::repository) modules, each adding an
//! `impl InvoicingGateway` block.

use std::sync::Arc;

use db::{QueryStore, StoreConfig};
use tracing::info;

use crate::GatewayError;

/// Named invoicing operations over a backing store.
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct InvoicingGateway {
    store: Arc<dyn QueryStore>,
}

impl InvoicingGateway {
    /// Wrap an already constructed store.
    pub fn new(store: Arc<dyn QueryStore>) -> Self {
        Self { store }
    }

    /// Connect to the hosted store described by `config`.
    pub fn connect(config: &StoreConfig) -> Result<Self, GatewayError> {
        let store = db::connect(config)?;
        info!("Invoicing gateway ready");
        Ok(Self::new(Arc::new(store)))
    }

    /// Read [`StoreConfig`] from the environment and connect.
    ///
    /// # Errors
    /// Returns [`GatewayError::Configuration`] if `STORE_URL` or
    /// `STORE_API_KEY` is absent.
    pub fn from_env() -> Result<Self, GatewayError> {
        let config = StoreConfig::from_env()?;
        Self::connect(&config)
    }

    pub(crate) fn store(&self) -> &dyn QueryStore {
        self.store.as_ref()
    }
}
