//! Batch reconciliation settings.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use super::SettingsError;
use crate::domain::{RateLimitPolicy, ReconciliationConfig};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
const DEFAULT_BATCH_SIZE: usize = 50;

/// Overrides for [`ReconciliationConfig`], read from `RECONCILE_*`.
///
/// Unset fields keep the domain defaults.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "RECONCILE")]
pub struct ReconciliationSettings {
    #[ortho_config(default = 50)]
    pub batch_size: usize,
    pub concurrency: Option<usize>,
    pub inter_request_delay_ms: Option<u64>,
    pub inter_batch_delay_ms: Option<u64>,
    pub max_runtime_secs: Option<u64>,
    pub max_batches: Option<u32>,
    /// Days after which a checked vehicle becomes due again.
    pub staleness_ttl_days: Option<u64>,
    pub max_attempts: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub rate_limit_cooldown_ms: Option<u64>,
    pub rate_limit_abort_threshold: Option<u32>,
    /// `leave_unstamped` (default) or `stamp_as_checked`.
    pub rate_limit_policy: Option<String>,
}

impl Default for ReconciliationSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: None,
            inter_request_delay_ms: None,
            inter_batch_delay_ms: None,
            max_runtime_secs: None,
            max_batches: None,
            staleness_ttl_days: None,
            max_attempts: None,
            initial_backoff_ms: None,
            max_backoff_ms: None,
            rate_limit_cooldown_ms: None,
            rate_limit_abort_threshold: None,
            rate_limit_policy: None,
        }
    }
}

fn parse_rate_limit_policy(raw: &str) -> Result<RateLimitPolicy, SettingsError> {
    match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "leave_unstamped" => Ok(RateLimitPolicy::LeaveUnstamped),
        "stamp_as_checked" => Ok(RateLimitPolicy::StampAsChecked),
        other => Err(SettingsError::Invalid {
            name: "RECONCILE_RATE_LIMIT_POLICY",
            message: format!("expected leave_unstamped or stamp_as_checked, got {other:?}"),
        }),
    }
}

fn millis_or(value: Option<u64>, fallback: Duration) -> Duration {
    value.map_or(fallback, Duration::from_millis)
}

impl ReconciliationSettings {
    /// Apply the overrides on top of the domain defaults.
    ///
    /// # Errors
    /// Returns [`SettingsError::Invalid`] for an unknown rate-limit policy.
    pub fn to_config(&self) -> Result<ReconciliationConfig, SettingsError> {
        let defaults = ReconciliationConfig::default();
        let rate_limit_policy = self
            .rate_limit_policy
            .as_deref()
            .map(parse_rate_limit_policy)
            .transpose()?
            .unwrap_or(defaults.rate_limit_policy);
        Ok(ReconciliationConfig {
            batch_size: self.batch_size,
            concurrency: self.concurrency.unwrap_or(defaults.concurrency),
            inter_request_delay: millis_or(self.inter_request_delay_ms, defaults.inter_request_delay),
            inter_batch_delay: millis_or(self.inter_batch_delay_ms, defaults.inter_batch_delay),
            max_runtime: self
                .max_runtime_secs
                .map_or(defaults.max_runtime, Duration::from_secs),
            max_batches: self.max_batches.or(defaults.max_batches),
            staleness_ttl: self.staleness_ttl_days.map_or(defaults.staleness_ttl, |days| {
                Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY))
            }),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            initial_backoff: millis_or(self.initial_backoff_ms, defaults.initial_backoff),
            max_backoff: millis_or(self.max_backoff_ms, defaults.max_backoff),
            rate_limit_policy,
            rate_limit_cooldown: millis_or(self.rate_limit_cooldown_ms, defaults.rate_limit_cooldown),
            rate_limit_abort_threshold: self
                .rate_limit_abort_threshold
                .unwrap_or(defaults.rate_limit_abort_threshold),
        })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for reconciliation settings parsing.

    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    use super::*;

    fn load_from_empty_args() -> ReconciliationSettings {
        ReconciliationSettings::load_from_iter([OsString::from("reconcile-vehicles")])
            .expect("config should load")
    }

    #[rstest]
    fn defaults_match_the_domain_defaults() {
        let _guard = lock_env([
            ("RECONCILE_BATCH_SIZE", None::<String>),
            ("RECONCILE_STALENESS_TTL_DAYS", None::<String>),
            ("RECONCILE_RATE_LIMIT_POLICY", None::<String>),
            ("RECONCILE_MAX_BATCHES", None::<String>),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(
            settings.to_config().expect("defaults convert"),
            ReconciliationConfig::default()
        );
        assert_eq!(
            ReconciliationSettings::default().to_config().expect("defaults convert"),
            ReconciliationConfig::default()
        );
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("RECONCILE_BATCH_SIZE", Some("25".to_owned())),
            ("RECONCILE_STALENESS_TTL_DAYS", Some("30".to_owned())),
            ("RECONCILE_RATE_LIMIT_POLICY", Some("stamp_as_checked".to_owned())),
            ("RECONCILE_MAX_BATCHES", Some("4".to_owned())),
        ]);

        let config = load_from_empty_args()
            .to_config()
            .expect("overrides convert");
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.staleness_ttl, Duration::from_secs(30 * SECONDS_PER_DAY));
        assert_eq!(config.rate_limit_policy, RateLimitPolicy::StampAsChecked);
        assert_eq!(config.max_batches, Some(4));
        assert_eq!(config.concurrency, ReconciliationConfig::default().concurrency);
    }

    #[rstest]
    #[case::snake("leave_unstamped", RateLimitPolicy::LeaveUnstamped)]
    #[case::kebab("Stamp-As-Checked", RateLimitPolicy::StampAsChecked)]
    #[case::padded(" stamp_as_checked ", RateLimitPolicy::StampAsChecked)]
    fn rate_limit_policy_names_parse(#[case] raw: &str, #[case] expected: RateLimitPolicy) {
        let settings = ReconciliationSettings {
            rate_limit_policy: Some(raw.to_owned()),
            ..ReconciliationSettings::default()
        };
        assert_eq!(
            settings.to_config().expect("policy parses").rate_limit_policy,
            expected
        );
    }

    #[rstest]
    fn unknown_rate_limit_policy_is_rejected() {
        let settings = ReconciliationSettings {
            rate_limit_policy: Some("sometimes".to_owned()),
            ..ReconciliationSettings::default()
        };
        assert!(matches!(
            settings.to_config(),
            Err(SettingsError::Invalid {
                name: "RECONCILE_RATE_LIMIT_POLICY",
                ..
            })
        ));
    }
}
