//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the vehicle repository ports backed by
//! PostgreSQL via `diesel-async` and `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: repositories only translate between Diesel rows and
//!   domain types. The COALESCE merge is expressed in SQL so it applies
//!   atomically with the timestamp stamp.
//! - **Internal models**: row structs (`models.rs`) and the table definition
//!   (`schema.rs`) never leave this module.
//! - **Short checkouts**: every statement checks out its own connection.
//!
//! # Example
//!
//! ```ignore
//! use garage_backend::outbound::persistence::{DbPool, DieselVehicleRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/garage")).await?;
//! let repository = DieselVehicleRepository::new(pool);
//! ```

mod diesel_helpers;
mod diesel_vehicle_import_repository;
mod diesel_vehicle_repository;
mod models;
mod pool;
mod schema;

pub use diesel_vehicle_import_repository::DieselVehicleImportRepository;
pub use diesel_vehicle_repository::DieselVehicleRepository;
pub use pool::{DbPool, PoolConfig, PoolError};
