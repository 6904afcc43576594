//! OAuth2 client-credentials token cache for the DVSA API.
//!
//! The token lives inside the cache object; each `DvsaHttpSource` owns one.
//! Concurrent workers serialise on the cache lock so only one refresh is in
//! flight at a time.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use reqwest::{Client, StatusCode, Url};
use tokio::sync::Mutex;
use tracing::debug;
use zeroize::Zeroizing;

use super::dto::TokenResponseDto;
use crate::domain::ports::VehicleLookupError;
use crate::outbound::vehicle_api::{body_preview, map_status_error, map_transport_error};

/// Client-credentials grant parameters.
pub struct DvsaCredentials {
    /// OAuth2 token endpoint.
    pub token_url: Url,
    /// Application (client) identifier.
    pub client_id: String,
    /// Client secret.
    pub client_secret: Zeroizing<String>,
    /// Requested scope.
    pub scope: String,
}

impl fmt::Debug for DvsaCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DvsaCredentials")
            .field("token_url", &self.token_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .finish()
    }
}

struct CachedToken {
    value: Zeroizing<String>,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        let margin = TimeDelta::from_std(margin).unwrap_or(TimeDelta::MAX);
        now.checked_add_signed(margin)
            .is_some_and(|deadline| deadline < self.expires_at)
    }
}

/// Cached bearer token refreshed shortly before expiry.
pub struct DvsaTokenCache {
    client: Client,
    credentials: DvsaCredentials,
    expiry_margin: Duration,
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<CachedToken>>,
}

impl DvsaTokenCache {
    pub fn new(
        client: Client,
        credentials: DvsaCredentials,
        expiry_margin: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            credentials,
            expiry_margin,
            clock,
            cached: Mutex::new(None),
        }
    }

    /// Return a valid bearer token, fetching a new one when needed.
    pub async fn bearer_token(&self) -> Result<Zeroizing<String>, VehicleLookupError> {
        let mut cached = self.cached.lock().await;
        let now = self.clock.utc();
        if let Some(token) = cached
            .as_ref()
            .filter(|token| token.is_fresh(now, self.expiry_margin))
        {
            return Ok(token.value.clone());
        }

        let token = self.request_token(now).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Drop the cached token so the next call fetches a fresh one.
    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }

    async fn request_token(&self, now: DateTime<Utc>) -> Result<CachedToken, VehicleLookupError> {
        let credentials = &self.credentials;
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("scope", credentials.scope.as_str()),
        ];
        let response = self
            .client
            .post(credentials.token_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED) {
            return Err(VehicleLookupError::unauthorized(format!(
                "token request rejected with status {}: {}",
                status.as_u16(),
                body_preview(body.as_ref())
            )));
        }
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        let token = decode_token(body.as_ref(), now)?;
        debug!(expires_at = %token.expires_at, "dvsa access token refreshed");
        Ok(token)
    }
}

fn decode_token(body: &[u8], now: DateTime<Utc>) -> Result<CachedToken, VehicleLookupError> {
    let decoded: TokenResponseDto = serde_json::from_slice(body).map_err(|error| {
        VehicleLookupError::decode(format!("invalid DVSA token payload: {error}"))
    })?;
    let lifetime = i64::try_from(decoded.expires_in).unwrap_or(i64::MAX);
    let expires_at = now
        .checked_add_signed(TimeDelta::seconds(lifetime.min(i64::MAX / 1_000)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    Ok(CachedToken {
        value: Zeroizing::new(decoded.access_token),
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0)
            .single()
            .expect("valid time")
    }

    #[rstest]
    fn decodes_token_lifetime(now: DateTime<Utc>) {
        let token = decode_token(
            br#"{"token_type":"Bearer","expires_in":3599,"access_token":"abc"}"#,
            now,
        )
        .expect("token decodes");
        assert_eq!(token.value.as_str(), "abc");
        assert_eq!(token.expires_at, now + TimeDelta::seconds(3_599));
    }

    #[rstest]
    #[case::well_before_expiry(TimeDelta::minutes(30), true)]
    #[case::inside_margin(TimeDelta::seconds(30), false)]
    #[case::expired(TimeDelta::seconds(-5), false)]
    fn freshness_honours_margin(
        now: DateTime<Utc>,
        #[case] remaining: TimeDelta,
        #[case] fresh: bool,
    ) {
        let token = CachedToken {
            value: Zeroizing::new("abc".to_owned()),
            expires_at: now + remaining,
        };
        assert_eq!(token.is_fresh(now, Duration::from_secs(60)), fresh);
    }

    #[rstest]
    fn debug_output_redacts_the_client_secret() {
        let credentials = DvsaCredentials {
            token_url: Url::parse("https://login.example.test/token").expect("valid url"),
            client_id: "client".to_owned(),
            client_secret: Zeroizing::new("hunter2".to_owned()),
            scope: "scope".to_owned(),
        };
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("client"));
        assert!(!rendered.contains("hunter2"));
    }

    #[rstest]
    fn missing_token_field_is_a_decode_error(now: DateTime<Utc>) {
        let error = decode_token(br#"{"expires_in":60}"#, now)
            .err()
            .expect("decode should fail");
        assert!(matches!(error, VehicleLookupError::Decode { .. }));
    }
}
