//! Garage vehicle data backend.
//!
//! Reconciles stored vehicle details against the DVLA and DVSA APIs in
//! bounded, fault-isolated batches, imports vehicles from CSV, and exposes
//! both over HTTP. The crate follows a hexagonal layout: [`domain`] owns the
//! rules and ports, [`outbound`] holds the API and database adapters, and
//! [`inbound`] holds the HTTP and CSV edges.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::RequestSpan;
