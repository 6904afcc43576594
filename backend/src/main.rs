//! Backend entry-point: wires the vehicle API adapter, the Diesel repository,
//! and the reconciler into the HTTP server.

mod server;

use std::ffi::OsString;
use std::io;
use std::sync::Arc;

use actix_web::web;
use garage_backend::inbound::http::health::HealthState;
use garage_backend::outbound::persistence::{DbPool, DieselVehicleRepository, PoolConfig};
use garage_backend::settings::{
    DvlaSettings, DvsaSettings, ReconciliationSettings, ServerSettings, build_lookup_source,
    resolve_database_url,
};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use server::{ServerConfig, create_server};

const PROGRAM_NAME: &str = "garage-backend";

fn settings_error(error: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, error.to_string())
}

// Settings come from the environment and config files only.
fn program_args() -> [OsString; 1] {
    [OsString::from(PROGRAM_NAME)]
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(%error, "tracing init failed");
    }

    let server_settings =
        ServerSettings::load_from_iter(program_args()).map_err(settings_error)?;
    let reconciliation = ReconciliationSettings::load_from_iter(program_args())
        .map_err(settings_error)?
        .to_config()
        .map_err(settings_error)?;
    let dvla = DvlaSettings::load_from_iter(program_args()).map_err(settings_error)?;
    let dvsa = DvsaSettings::load_from_iter(program_args()).map_err(settings_error)?;
    let lookup_source =
        build_lookup_source(dvla, dvsa, Arc::new(DefaultClock)).map_err(settings_error)?;

    let database_url = resolve_database_url(None).map_err(settings_error)?;
    let pool = DbPool::new(
        PoolConfig::new(database_url.as_str())
            .with_max_size(server_settings.pool_max_size())
            .with_connection_timeout(server_settings.pool_timeout()),
    )
    .await
    .map_err(|error| io::Error::other(format!("create database pool: {error}")))?;

    let bind_addr = server_settings.bind_addr().map_err(settings_error)?;
    let config = ServerConfig::new(
        bind_addr,
        Arc::new(DieselVehicleRepository::new(pool)),
        lookup_source.clone(),
    )
    .with_reconciliation(reconciliation);

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config)?;
    info!(%bind_addr, source = lookup_source.source_name(), "garage backend listening");
    server.await
}
