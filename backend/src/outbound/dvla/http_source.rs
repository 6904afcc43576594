//! Reqwest-backed DVLA Vehicle Enquiry Service adapter.
//!
//! This adapter owns transport details only: request serialisation, the API
//! key header, status mapping, and JSON decoding into domain details.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;
use zeroize::Zeroizing;

use super::dto::{VehicleEnquiryRequestDto, VehicleEnquiryResponseDto};
use crate::domain::Registration;
use crate::domain::ports::{VehicleLookup, VehicleLookupError, VehicleLookupSource};
use crate::outbound::vehicle_api::{map_status_error, map_transport_error};

const API_KEY_HEADER: &str = "x-api-key";
const DEFAULT_USER_AGENT: &str = "garage-backend-vehicle-reconciler/0.1";

/// DVLA source adapter that POSTs one registration per request.
pub struct DvlaHttpSource {
    client: Client,
    endpoint: Url,
    api_key: Zeroizing<String>,
}

impl DvlaHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    /// ```rust,ignore
    /// let source = DvlaHttpSource::new(endpoint, Zeroizing::new(key), timeout)?;
    /// ```
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoint: Url,
        api_key: Zeroizing<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl VehicleLookupSource for DvlaHttpSource {
    fn source_name(&self) -> &'static str {
        "dvla"
    }

    async fn lookup(
        &self,
        registration: &Registration,
    ) -> Result<VehicleLookup, VehicleLookupError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&VehicleEnquiryRequestDto {
                registration_number: registration.as_str(),
            })
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        debug!(registration = %registration, status = status.as_u16(), "dvla responded");
        if status == StatusCode::NOT_FOUND {
            return Ok(VehicleLookup::NotFound);
        }
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        parse_vehicle(body.as_ref())
    }
}

fn parse_vehicle(body: &[u8]) -> Result<VehicleLookup, VehicleLookupError> {
    let decoded: VehicleEnquiryResponseDto = serde_json::from_slice(body).map_err(|error| {
        VehicleLookupError::decode(format!("invalid DVLA JSON payload: {error}"))
    })?;
    Ok(VehicleLookup::Found(decoded.into_details()))
}
