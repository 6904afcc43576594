//! DVSA MOT History API settings.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use zeroize::Zeroizing;

use super::{SettingsError, non_blank, parse_url};
use crate::outbound::dvsa::{DvsaCredentials, DvsaHttpConfig};

const DEFAULT_BASE_URL: &str = "https://history.mot.api.gov.uk";
const DEFAULT_SCOPE: &str = "https://tapi.dvsa.gov.uk/.default";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TOKEN_EXPIRY_MARGIN_SECS: u64 = 60;

/// Settings for the DVSA adapter, read from `DVSA_*`.
///
/// The adapter is enabled once any credential is set; it then requires the
/// API key, client id, client secret, and token URL.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "DVSA")]
pub struct DvsaSettings {
    pub api_key: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// OAuth2 token endpoint for the client-credentials grant.
    pub token_url: Option<String>,
    pub scope: Option<String>,
    pub base_url: Option<String>,
    /// Per-request timeout in seconds.
    #[ortho_config(default = 10)]
    pub timeout_secs: u64,
    /// Refresh cached tokens this many seconds before they expire.
    #[ortho_config(default = 60)]
    pub token_expiry_margin_secs: u64,
}

impl Default for DvsaSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            client_id: None,
            client_secret: None,
            token_url: None,
            scope: None,
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            token_expiry_margin_secs: DEFAULT_TOKEN_EXPIRY_MARGIN_SECS,
        }
    }
}

fn required(name: &'static str, value: Option<String>) -> Result<String, SettingsError> {
    non_blank(value).ok_or(SettingsError::Missing { name })
}

impl DvsaSettings {
    /// Return whether any DVSA credential is present.
    pub fn is_configured(&self) -> bool {
        [
            &self.api_key,
            &self.client_id,
            &self.client_secret,
            &self.token_url,
        ]
        .into_iter()
        .any(|value| value.as_deref().is_some_and(|raw| !raw.trim().is_empty()))
    }

    /// Consume the settings into adapter configuration, or `None` when unset.
    ///
    /// # Errors
    /// Returns [`SettingsError::Missing`] for a partial configuration and
    /// [`SettingsError::Invalid`] for malformed URLs.
    pub fn into_http_config(self) -> Result<Option<DvsaHttpConfig>, SettingsError> {
        if !self.is_configured() {
            return Ok(None);
        }
        let base_url = parse_url(
            "DVSA_BASE_URL",
            self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
        )?;
        let token_url = parse_url("DVSA_TOKEN_URL", &required("DVSA_TOKEN_URL", self.token_url)?)?;
        let credentials = DvsaCredentials {
            token_url,
            client_id: required("DVSA_CLIENT_ID", self.client_id)?,
            client_secret: Zeroizing::new(required("DVSA_CLIENT_SECRET", self.client_secret)?),
            scope: non_blank(self.scope).unwrap_or_else(|| DEFAULT_SCOPE.to_owned()),
        };
        Ok(Some(DvsaHttpConfig {
            base_url,
            api_key: Zeroizing::new(required("DVSA_API_KEY", self.api_key)?),
            credentials,
            timeout: Duration::from_secs(self.timeout_secs),
            token_expiry_margin: Duration::from_secs(self.token_expiry_margin_secs),
        }))
    }
}
