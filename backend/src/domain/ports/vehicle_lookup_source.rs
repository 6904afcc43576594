//! Driven port for looking up one vehicle in a UK government API.
//!
//! Adapters translate HTTP status codes into the typed outcomes below so the
//! reconciliation worker never inspects error strings.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{Registration, VehicleDetails};

/// Successful lookup outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VehicleLookup {
    /// The API knows the vehicle. The snapshot may still be empty.
    Found(VehicleDetails),
    /// The API has no record for the registration.
    NotFound,
}

define_port_error! {
    /// Failures surfaced while calling a vehicle lookup API.
    pub enum VehicleLookupError {
        /// The API rejected the call because of rate limiting.
        RateLimited { message: String } =>
            "vehicle lookup rate limited: {message}",
        /// The call exceeded its deadline.
        Timeout { message: String } =>
            "vehicle lookup timed out: {message}",
        /// Network failure or upstream 5xx.
        Transport { message: String } =>
            "vehicle lookup transport failed: {message}",
        /// Credentials or token were rejected; no further lookups can succeed.
        Unauthorized { message: String } =>
            "vehicle lookup unauthorised: {message}",
        /// Response body could not be decoded.
        Decode { message: String } =>
            "vehicle lookup response decode failed: {message}",
        /// The API rejected the request itself.
        InvalidRequest { message: String } =>
            "vehicle lookup request invalid: {message}",
    }
}

impl VehicleLookupError {
    /// Return whether retrying the same record is expected to help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }

    /// Return whether the whole run must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Port for translating a registration into vehicle details.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VehicleLookupSource: Send + Sync {
    /// Short adapter name for logs and reports (`dvla`, `dvsa`).
    fn source_name(&self) -> &'static str;

    /// Look up one vehicle.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use garage_backend::domain::Registration;
    /// use garage_backend::domain::ports::{FixtureVehicleLookupSource, VehicleLookup, VehicleLookupSource};
    ///
    /// let source = FixtureVehicleLookupSource;
    /// let registration = Registration::parse("AB12CDE")?;
    /// assert_eq!(source.lookup(&registration).await?, VehicleLookup::NotFound);
    /// ```
    async fn lookup(&self, registration: &Registration)
    -> Result<VehicleLookup, VehicleLookupError>;
}

/// Fixture implementation that knows no vehicles.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureVehicleLookupSource;

#[async_trait]
impl VehicleLookupSource for FixtureVehicleLookupSource {
    fn source_name(&self) -> &'static str {
        "fixture"
    }

    async fn lookup(
        &self,
        _registration: &Registration,
    ) -> Result<VehicleLookup, VehicleLookupError> {
        Ok(VehicleLookup::NotFound)
    }
}
