//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **dvla**: Vehicle Enquiry Service lookups (API key).
//! - **dvsa**: MOT history lookups (OAuth2 bearer token plus API key).
//! - **persistence**: PostgreSQL-backed vehicle repositories using Diesel.
//!
//! Adapters are thin translators between domain types and infrastructure
//! representations. They contain no business logic.

pub mod dvla;
pub mod dvsa;
pub mod persistence;
mod vehicle_api;
