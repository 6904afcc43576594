//! HTTP server configuration object.

use std::net::SocketAddr;
use std::sync::Arc;

use garage_backend::domain::ReconciliationConfig;
use garage_backend::domain::ports::{VehicleLookupSource, VehicleRepository};

/// Everything the server needs once settings have been resolved.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) repository: Arc<dyn VehicleRepository>,
    pub(crate) lookup_source: Arc<dyn VehicleLookupSource>,
    pub(crate) reconciliation: ReconciliationConfig,
}

impl ServerConfig {
    /// Construct a server configuration from resolved adapters.
    #[must_use]
    pub fn new(
        bind_addr: SocketAddr,
        repository: Arc<dyn VehicleRepository>,
        lookup_source: Arc<dyn VehicleLookupSource>,
    ) -> Self {
        Self {
            bind_addr,
            repository,
            lookup_source,
            reconciliation: ReconciliationConfig::default(),
        }
    }

    /// Override the reconciler configuration.
    #[must_use]
    pub fn with_reconciliation(mut self, reconciliation: ReconciliationConfig) -> Self {
        self.reconciliation = reconciliation;
        self
    }
}
