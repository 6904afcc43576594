//! `DATABASE_URL` resolution shared by the binaries.

use std::env;

use zeroize::Zeroizing;

use super::SettingsError;

/// Resolve the database URL: an explicit value wins over `DATABASE_URL`.
///
/// # Errors
/// Returns [`SettingsError::Invalid`] for a blank explicit value and
/// [`SettingsError::Missing`] when neither source provides a URL.
pub fn resolve_database_url(explicit: Option<String>) -> Result<Zeroizing<String>, SettingsError> {
    if let Some(value) = explicit {
        if value.trim().is_empty() {
            return Err(SettingsError::Invalid {
                name: "--database-url",
                message: "must not be empty when provided".to_owned(),
            });
        }
        return Ok(Zeroizing::new(value));
    }

    match env::var("DATABASE_URL") {
        Ok(value) if !value.trim().is_empty() => Ok(Zeroizing::new(value)),
        _ => Err(SettingsError::Missing {
            name: "DATABASE_URL",
        }),
    }
}

#[cfg(test)]
mod tests {
    use env_lock::lock_env;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn explicit_value_wins_over_environment() {
        let _guard = lock_env([("DATABASE_URL", Some("postgres://env/garage"))]);
        let url = resolve_database_url(Some("postgres://flag/garage".to_owned()))
            .expect("explicit value resolves");
        assert_eq!(url.as_str(), "postgres://flag/garage");
    }

    #[rstest]
    fn blank_explicit_value_is_rejected() {
        let error = resolve_database_url(Some("   ".to_owned())).expect_err("blank should fail");
        assert!(matches!(error, SettingsError::Invalid { .. }));
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    fn missing_environment_is_reported(#[case] value: Option<&str>) {
        let _guard = lock_env([("DATABASE_URL", value)]);
        let error = resolve_database_url(None).expect_err("missing should fail");
        assert_eq!(error, SettingsError::Missing { name: "DATABASE_URL" });
    }
}
