//! Reqwest-backed DVSA MOT history adapter.
//!
//! Requests carry a cached OAuth2 bearer token plus the subscription API key.
//! A 401 invalidates the token and the call is retried once with a fresh one.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::dto::MotVehicleDto;
use super::token::{DvsaCredentials, DvsaTokenCache};
use crate::domain::Registration;
use crate::domain::ports::{VehicleLookup, VehicleLookupError, VehicleLookupSource};
use crate::outbound::vehicle_api::{map_status_error, map_transport_error};

const API_KEY_HEADER: &str = "X-API-Key";
const DEFAULT_USER_AGENT: &str = "garage-backend-vehicle-reconciler/0.1";

/// Connection settings for [`DvsaHttpSource`].
pub struct DvsaHttpConfig {
    /// API root, e.g. `https://history.mot.api.gov.uk`.
    pub base_url: Url,
    /// Subscription key sent as `X-API-Key`.
    pub api_key: Zeroizing<String>,
    /// OAuth2 client-credentials grant.
    pub credentials: DvsaCredentials,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Refresh the token when it expires within this margin.
    pub token_expiry_margin: Duration,
}

impl fmt::Debug for DvsaHttpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DvsaHttpConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .field("credentials", &self.credentials)
            .field("timeout", &self.timeout)
            .field("token_expiry_margin", &self.token_expiry_margin)
            .finish()
    }
}

/// DVSA source adapter issuing one GET per registration.
pub struct DvsaHttpSource {
    client: Client,
    base_url: Url,
    api_key: Zeroizing<String>,
    tokens: DvsaTokenCache,
}

enum Attempt {
    Done(Result<VehicleLookup, VehicleLookupError>),
    TokenRejected(VehicleLookupError),
}

impl DvsaHttpSource {
    /// Build an adapter and its token cache.
    /// ```rust,ignore
    /// let source = DvsaHttpSource::new(config, Arc::new(DefaultClock))?;
    /// ```
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: DvsaHttpConfig, clock: Arc<dyn Clock>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        let tokens = DvsaTokenCache::new(
            client.clone(),
            config.credentials,
            config.token_expiry_margin,
            clock,
        );
        Ok(Self {
            client,
            base_url: config.base_url,
            api_key: config.api_key,
            tokens,
        })
    }

    fn vehicle_url(&self, registration: &Registration) -> Result<Url, VehicleLookupError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| VehicleLookupError::invalid_request("DVSA base URL cannot be a base"))?
            .pop_if_empty()
            .extend(["v1", "trade", "vehicles", "registration", registration.as_str()]);
        Ok(url)
    }

    async fn attempt(&self, url: &Url, registration: &Registration) -> Attempt {
        let token = match self.tokens.bearer_token().await {
            Ok(token) => token,
            Err(error) => return Attempt::Done(Err(error)),
        };
        let sent = self
            .client
            .get(url.clone())
            .bearer_auth(token.as_str())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await;
        let response = match sent {
            Ok(response) => response,
            Err(error) => return Attempt::Done(Err(map_transport_error(error))),
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(error) => return Attempt::Done(Err(map_transport_error(error))),
        };
        debug!(registration = %registration, status = status.as_u16(), "dvsa responded");
        match status {
            StatusCode::NOT_FOUND => Attempt::Done(Ok(VehicleLookup::NotFound)),
            StatusCode::UNAUTHORIZED => {
                Attempt::TokenRejected(map_status_error(status, body.as_ref()))
            }
            _ if !status.is_success() => Attempt::Done(Err(map_status_error(status, body.as_ref()))),
            _ => Attempt::Done(parse_vehicle(body.as_ref())),
        }
    }
}

#[async_trait]
impl VehicleLookupSource for DvsaHttpSource {
    fn source_name(&self) -> &'static str {
        "dvsa"
    }

    async fn lookup(
        &self,
        registration: &Registration,
    ) -> Result<VehicleLookup, VehicleLookupError> {
        let url = self.vehicle_url(registration)?;
        match self.attempt(&url, registration).await {
            Attempt::Done(result) => result,
            Attempt::TokenRejected(_) => {
                warn!(registration = %registration, "dvsa rejected bearer token; refreshing");
                self.tokens.invalidate().await;
                match self.attempt(&url, registration).await {
                    Attempt::Done(result) => result,
                    Attempt::TokenRejected(error) => Err(error),
                }
            }
        }
    }
}

fn parse_vehicle(body: &[u8]) -> Result<VehicleLookup, VehicleLookupError> {
    let decoded: MotVehicleDto = serde_json::from_slice(body).map_err(|error| {
        VehicleLookupError::decode(format!("invalid DVSA JSON payload: {error}"))
    })?;
    Ok(VehicleLookup::Found(decoded.into_details()))
}
