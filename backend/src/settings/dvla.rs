//! DVLA Vehicle Enquiry Service settings.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

use super::{SettingsError, non_blank, parse_url};

const DEFAULT_ENDPOINT: &str =
    "https://driver-vehicle-licensing.api.gov.uk/vehicle-enquiry/v1/vehicles";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Settings for the DVLA adapter, read from `DVLA_*`.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "DVLA")]
pub struct DvlaSettings {
    /// API key sent as `x-api-key`. The adapter is disabled when unset.
    pub api_key: Option<String>,
    /// Vehicle enquiry endpoint override.
    pub endpoint: Option<String>,
    /// Per-request timeout in seconds.
    #[ortho_config(default = 10)]
    pub timeout_secs: u64,
}

impl Default for DvlaSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl DvlaSettings {
    /// Return whether an API key is present.
    pub fn is_configured(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    /// Return the configured endpoint, falling back to the public service.
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    /// Return the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Consume the settings into adapter arguments, or `None` without a key.
    ///
    /// # Errors
    /// Returns [`SettingsError::Invalid`] when the endpoint is not a URL.
    pub fn into_parts(
        self,
    ) -> Result<Option<(Url, Zeroizing<String>, Duration)>, SettingsError> {
        let endpoint = parse_url("DVLA_ENDPOINT", self.endpoint())?;
        let timeout = self.timeout();
        Ok(non_blank(self.api_key).map(|key| (endpoint, Zeroizing::new(key), timeout)))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for DVLA settings parsing.

    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    use super::*;

    fn load_from_empty_args() -> DvlaSettings {
        DvlaSettings::load_from_iter([OsString::from("garage-backend")])
            .expect("config should load")
    }

    #[rstest]
    fn defaults_leave_the_adapter_disabled() {
        let _guard = lock_env([
            ("DVLA_API_KEY", None::<String>),
            ("DVLA_ENDPOINT", None::<String>),
            ("DVLA_TIMEOUT_SECS", None::<String>),
        ]);

        let settings = load_from_empty_args();
        assert!(!settings.is_configured());
        assert_eq!(settings.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(settings.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(settings.into_parts().expect("valid defaults").is_none());
    }

    #[rstest]
    fn loads_when_only_dvsa_is_configured() {
        let _guard = lock_env([
            ("DVLA_API_KEY", None::<String>),
            ("DVLA_ENDPOINT", None::<String>),
            ("DVLA_TIMEOUT_SECS", None::<String>),
            ("DVSA_API_KEY", Some("dvsa-key".to_owned())),
            ("DVSA_CLIENT_ID", Some("client".to_owned())),
        ]);

        let settings = DvlaSettings::load_from_iter([OsString::from("garage-backend")])
            .expect("DVLA settings should load without any DVLA_* variables");
        assert_eq!(settings.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(settings.api_key.is_none());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("DVLA_API_KEY", Some("secret-key".to_owned())),
            ("DVLA_ENDPOINT", Some("https://dvla.example.test/vehicles".to_owned())),
            ("DVLA_TIMEOUT_SECS", Some("3".to_owned())),
        ]);

        let (endpoint, api_key, timeout) = load_from_empty_args()
            .into_parts()
            .expect("valid settings")
            .expect("adapter configured");
        assert_eq!(endpoint.as_str(), "https://dvla.example.test/vehicles");
        assert_eq!(api_key.as_str(), "secret-key");
        assert_eq!(timeout, Duration::from_secs(3));
    }

    #[rstest]
    fn invalid_endpoint_is_rejected() {
        let settings = DvlaSettings {
            api_key: Some("key".to_owned()),
            endpoint: Some("not a url".to_owned()),
            ..DvlaSettings::default()
        };
        let error = settings.into_parts().expect_err("endpoint should fail");
        assert!(matches!(error, SettingsError::Invalid { name: "DVLA_ENDPOINT", .. }));
    }
}
