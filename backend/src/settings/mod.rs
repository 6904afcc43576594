//! Runtime settings loaded via OrthoConfig.
//!
//! Each concern has its own prefix so deployments can set only what they
//! use: `RECONCILE_*` for the batch loop, `DVLA_*` and `DVSA_*` for the
//! vehicle APIs, and `GARAGE_*` for the HTTP server. Secrets are moved into
//! [`zeroize::Zeroizing`] as soon as they leave the settings structs.

use std::sync::Arc;

use mockable::Clock;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::domain::ports::VehicleLookupSource;
use crate::outbound::dvla::DvlaHttpSource;
use crate::outbound::dvsa::DvsaHttpSource;

mod database;
mod dvla;
mod dvsa;
mod reconciliation;
mod server;

pub use database::resolve_database_url;
pub use dvla::DvlaSettings;
pub use dvsa::DvsaSettings;
pub use reconciliation::ReconciliationSettings;
pub use server::ServerSettings;

/// Errors raised while turning settings into runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// A setting required by the chosen adapter is absent.
    #[error("missing setting {name}")]
    Missing { name: &'static str },
    /// A setting is present but unusable.
    #[error("invalid setting {name}: {message}")]
    Invalid { name: &'static str, message: String },
    /// Neither vehicle API has credentials.
    #[error("no vehicle API configured: set DVSA_* client credentials or DVLA_API_KEY")]
    NoLookupSource,
    /// The HTTP client could not be built.
    #[error("failed to build {source_name} client: {message}")]
    Client {
        source_name: &'static str,
        message: String,
    },
}

pub(crate) fn parse_url(name: &'static str, raw: &str) -> Result<Url, SettingsError> {
    Url::parse(raw).map_err(|error| SettingsError::Invalid {
        name,
        message: error.to_string(),
    })
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|candidate| !candidate.trim().is_empty())
}

/// Build the vehicle lookup adapter: DVSA when configured, otherwise DVLA.
///
/// # Errors
/// Returns [`SettingsError::NoLookupSource`] when neither API is configured,
/// or the adapter-specific error when its settings are incomplete.
pub fn build_lookup_source(
    dvla: DvlaSettings,
    dvsa: DvsaSettings,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn VehicleLookupSource>, SettingsError> {
    if let Some(config) = dvsa.into_http_config()? {
        info!(base_url = %config.base_url, "using DVSA vehicle API");
        let source = DvsaHttpSource::new(config, clock).map_err(|error| SettingsError::Client {
            source_name: "dvsa",
            message: error.to_string(),
        })?;
        return Ok(Arc::new(source));
    }
    if let Some((endpoint, api_key, timeout)) = dvla.into_parts()? {
        info!(%endpoint, "using DVLA vehicle API");
        let source =
            DvlaHttpSource::new(endpoint, api_key, timeout).map_err(|error| SettingsError::Client {
                source_name: "dvla",
                message: error.to_string(),
            })?;
        return Ok(Arc::new(source));
    }
    Err(SettingsError::NoLookupSource)
}
