//! Vehicle identity, enrichable details, and the staleness rule.
//!
//! Vehicles pre-exist in the garage store (CSV import or manual entry). The
//! reconciliation worker only fills blank details from external lookups and
//! stamps `last_checked_at`; it never creates or deletes vehicles.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_REGISTRATION_LEN: usize = 8;

/// UK vehicle registration mark used as the natural key.
///
/// ## Invariants
/// - Upper-case ASCII alphanumerics only, no whitespace.
/// - Between 1 and 8 characters long.
///
/// # Examples
/// ```
/// use garage_backend::domain::Registration;
///
/// let registration = Registration::parse(" ab12 cde ").expect("valid registration");
/// assert_eq!(registration.as_str(), "AB12CDE");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Registration(String);

/// Validation errors raised by [`Registration::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationValidationError {
    /// Nothing remained after stripping whitespace.
    #[error("registration must not be empty")]
    Empty,
    /// Normalised value exceeds the UK maximum.
    #[error("registration must be at most {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },
    /// Normalised value contains a non-alphanumeric character.
    #[error("registration contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

impl Registration {
    /// Normalise free-form input (upper-case, whitespace removed) and validate.
    pub fn parse(raw: &str) -> Result<Self, RegistrationValidationError> {
        let normalised = raw
            .chars()
            .filter(|character| !character.is_whitespace())
            .map(|character| character.to_ascii_uppercase())
            .collect::<String>();

        if normalised.is_empty() {
            return Err(RegistrationValidationError::Empty);
        }
        if let Some(character) = normalised
            .chars()
            .find(|character| !character.is_ascii_alphanumeric())
        {
            return Err(RegistrationValidationError::InvalidCharacter { character });
        }
        let actual = normalised.chars().count();
        if actual > MAX_REGISTRATION_LEN {
            return Err(RegistrationValidationError::TooLong {
                max: MAX_REGISTRATION_LEN,
                actual,
            });
        }
        Ok(Self(normalised))
    }

    /// Borrow the normalised registration.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Registration {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<String> for Registration {
    type Error = RegistrationValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Registration> for String {
    fn from(value: Registration) -> Self {
        value.0
    }
}

/// Enrichable vehicle attributes.
///
/// The same shape carries both the stored values and a remote snapshot;
/// every field is optional until enriched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDetails {
    pub make: Option<String>,
    pub model: Option<String>,
    pub colour: Option<String>,
    pub fuel_type: Option<String>,
    pub year_of_manufacture: Option<i32>,
    pub engine_capacity_cc: Option<i32>,
    pub mot_expiry_date: Option<NaiveDate>,
    pub tax_status: Option<String>,
    pub tax_due_date: Option<NaiveDate>,
}

/// Names of the enrichable fields, used for merge reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VehicleField {
    Make,
    Model,
    Colour,
    FuelType,
    YearOfManufacture,
    EngineCapacity,
    MotExpiryDate,
    TaxStatus,
    TaxDueDate,
}

impl VehicleField {
    /// Every enrichable field, in column order.
    pub const ALL: [Self; 9] = [
        Self::Make,
        Self::Model,
        Self::Colour,
        Self::FuelType,
        Self::YearOfManufacture,
        Self::EngineCapacity,
        Self::MotExpiryDate,
        Self::TaxStatus,
        Self::TaxDueDate,
    ];

    /// Stable column-style name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Make => "make",
            Self::Model => "model",
            Self::Colour => "colour",
            Self::FuelType => "fuel_type",
            Self::YearOfManufacture => "year_of_manufacture",
            Self::EngineCapacity => "engine_capacity_cc",
            Self::MotExpiryDate => "mot_expiry_date",
            Self::TaxStatus => "tax_status",
            Self::TaxDueDate => "tax_due_date",
        }
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|text| text.trim()).filter(|text| !text.is_empty())
}

impl VehicleDetails {
    /// Return whether at least one field carries a usable value.
    pub fn has_data(&self) -> bool {
        VehicleField::ALL
            .into_iter()
            .any(|field| self.is_present(field))
    }

    /// Return whether `field` holds a non-blank value.
    pub fn is_present(&self, field: VehicleField) -> bool {
        match field {
            VehicleField::Make => non_blank(self.make.as_ref()).is_some(),
            VehicleField::Model => non_blank(self.model.as_ref()).is_some(),
            VehicleField::Colour => non_blank(self.colour.as_ref()).is_some(),
            VehicleField::FuelType => non_blank(self.fuel_type.as_ref()).is_some(),
            VehicleField::YearOfManufacture => self.year_of_manufacture.is_some(),
            VehicleField::EngineCapacity => self.engine_capacity_cc.is_some(),
            VehicleField::MotExpiryDate => self.mot_expiry_date.is_some(),
            VehicleField::TaxStatus => non_blank(self.tax_status.as_ref()).is_some(),
            VehicleField::TaxDueDate => self.tax_due_date.is_some(),
        }
    }

    /// Fields that `remote` would fill: blank here and present there.
    ///
    /// # Examples
    /// ```
    /// use garage_backend::domain::{VehicleDetails, VehicleField};
    ///
    /// let stored = VehicleDetails { make: Some("FORD".to_owned()), ..VehicleDetails::default() };
    /// let remote = VehicleDetails {
    ///     make: Some("VAUXHALL".to_owned()),
    ///     colour: Some("BLUE".to_owned()),
    ///     ..VehicleDetails::default()
    /// };
    /// assert_eq!(stored.fillable_fields(&remote), vec![VehicleField::Colour]);
    /// ```
    pub fn fillable_fields(&self, remote: &Self) -> Vec<VehicleField> {
        VehicleField::ALL
            .into_iter()
            .filter(|field| !self.is_present(*field) && remote.is_present(*field))
            .collect()
    }

    /// COALESCE-style merge: keep every populated value, fill blanks from `remote`.
    pub fn merge_missing(&self, remote: &Self) -> Self {
        fn text(stored: &Option<String>, remote: &Option<String>) -> Option<String> {
            non_blank(stored.as_ref())
                .or_else(|| non_blank(remote.as_ref()))
                .map(str::to_owned)
        }

        Self {
            make: text(&self.make, &remote.make),
            model: text(&self.model, &remote.model),
            colour: text(&self.colour, &remote.colour),
            fuel_type: text(&self.fuel_type, &remote.fuel_type),
            year_of_manufacture: self.year_of_manufacture.or(remote.year_of_manufacture),
            engine_capacity_cc: self.engine_capacity_cc.or(remote.engine_capacity_cc),
            mot_expiry_date: self.mot_expiry_date.or(remote.mot_expiry_date),
            tax_status: text(&self.tax_status, &remote.tax_status),
            tax_due_date: self.tax_due_date.or(remote.tax_due_date),
        }
    }
}

/// Stored vehicle row as seen by the reconciliation worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleRecord {
    /// Natural key.
    pub registration: Registration,
    /// Current enrichable values.
    pub details: VehicleDetails,
    /// When the record was last looked up externally, if ever.
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl VehicleRecord {
    /// Build a never-checked record with no details.
    pub fn unchecked(registration: Registration) -> Self {
        Self {
            registration,
            details: VehicleDetails::default(),
            last_checked_at: None,
        }
    }
}

/// Decides when a record is due for another external lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    ttl: Duration,
}

impl StalenessPolicy {
    /// Build a policy with the given time-to-live.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Records checked before this instant are due.
    pub fn stale_before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let ttl = TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::MAX);
        now.checked_sub_signed(ttl).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Return whether `record` is due at `now`.
    pub fn is_due(&self, record: &VehicleRecord, now: DateTime<Utc>) -> bool {
        match record.last_checked_at {
            None => true,
            Some(checked_at) => checked_at < self.stale_before(now),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit coverage for registration normalisation and the merge rule.

    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::spaced(" ab12 cde ", "AB12CDE")]
    #[case::tabs("lm56\tnop", "LM56NOP")]
    #[case::short("a1", "A1")]
    fn registration_is_normalised(#[case] raw: &str, #[case] expected: &str) {
        let registration = Registration::parse(raw).expect("registration should parse");
        assert_eq!(registration.as_str(), expected);
    }

    #[rstest]
    #[case::blank("   ", RegistrationValidationError::Empty)]
    #[case::dash("AB-12", RegistrationValidationError::InvalidCharacter { character: '-' })]
    #[case::long("ABCDE12345", RegistrationValidationError::TooLong { max: 8, actual: 10 })]
    fn invalid_registrations_are_rejected(
        #[case] raw: &str,
        #[case] expected: RegistrationValidationError,
    ) {
        let error = Registration::parse(raw).expect_err("registration should fail");
        assert_eq!(error, expected);
    }

    #[rstest]
    fn registration_deserialises_through_normalisation() {
        let registration: Registration =
            serde_json::from_str("\"xy34 fgh\"").expect("registration should deserialise");
        assert_eq!(registration.as_str(), "XY34FGH");
    }

    #[rstest]
    fn merge_never_overwrites_populated_fields() {
        let stored = VehicleDetails {
            make: Some("FORD".to_owned()),
            model: Some("   ".to_owned()),
            mot_expiry_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            ..VehicleDetails::default()
        };
        let remote = VehicleDetails {
            make: Some("VAUXHALL".to_owned()),
            model: Some("FIESTA".to_owned()),
            mot_expiry_date: NaiveDate::from_ymd_opt(2027, 3, 1),
            tax_status: Some("Taxed".to_owned()),
            ..VehicleDetails::default()
        };

        let merged = stored.merge_missing(&remote);

        assert_eq!(merged.make.as_deref(), Some("FORD"));
        assert_eq!(merged.model.as_deref(), Some("FIESTA"));
        assert_eq!(merged.mot_expiry_date, NaiveDate::from_ymd_opt(2026, 3, 1));
        assert_eq!(merged.tax_status.as_deref(), Some("Taxed"));
        assert_eq!(
            stored.fillable_fields(&remote),
            vec![VehicleField::Model, VehicleField::TaxStatus]
        );
    }

    #[rstest]
    fn merge_is_idempotent() {
        let stored = VehicleDetails::default();
        let remote = VehicleDetails {
            colour: Some("RED".to_owned()),
            year_of_manufacture: Some(2014),
            ..VehicleDetails::default()
        };

        let once = stored.merge_missing(&remote);
        let twice = once.merge_missing(&remote);

        assert_eq!(once, twice);
        assert!(once.fillable_fields(&remote).is_empty());
    }

    #[rstest]
    fn blank_snapshot_has_no_data() {
        let snapshot = VehicleDetails {
            make: Some(" ".to_owned()),
            ..VehicleDetails::default()
        };
        assert!(!snapshot.has_data());
    }

    #[rstest]
    fn staleness_prefers_never_checked_and_respects_ttl() {
        let now = Utc
            .with_ymd_and_hms(2026, 10, 18, 9, 0, 0)
            .single()
            .expect("valid time");
        let policy = StalenessPolicy::new(Duration::from_secs(7 * 24 * 60 * 60));
        let registration = Registration::parse("AB12CDE").expect("valid registration");

        let never = VehicleRecord::unchecked(registration.clone());
        let fresh = VehicleRecord {
            last_checked_at: Some(now - TimeDelta::days(1)),
            ..VehicleRecord::unchecked(registration.clone())
        };
        let stale = VehicleRecord {
            last_checked_at: Some(now - TimeDelta::days(8)),
            ..VehicleRecord::unchecked(registration)
        };

        assert!(policy.is_due(&never, now));
        assert!(!policy.is_due(&fresh, now));
        assert!(policy.is_due(&stale, now));
    }
}
