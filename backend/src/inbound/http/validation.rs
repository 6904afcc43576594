//! Shared validation helpers for inbound HTTP adapters.

use actix_web::error::JsonPayloadError;
use actix_web::web;
use serde_json::json;

use crate::domain::{Error, Registration};

/// Validation error codes reported in `details.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValidationCode {
    InvalidRegistration,
    InvalidBody,
}

impl ValidationCode {
    fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRegistration => "invalid_registration",
            Self::InvalidBody => "invalid_body",
        }
    }
}

/// Normalise and validate a registration taken from the request path.
pub(crate) fn parse_registration(raw: &str) -> Result<Registration, Error> {
    Registration::parse(raw).map_err(|error| {
        Error::invalid_request(error.to_string()).with_details(json!({
            "field": "registration",
            "value": raw,
            "code": ValidationCode::InvalidRegistration.as_str(),
        }))
    })
}

fn json_payload_error(error: &JsonPayloadError) -> Error {
    Error::invalid_request(format!("invalid JSON body: {error}")).with_details(json!({
        "code": ValidationCode::InvalidBody.as_str(),
    }))
}

/// JSON extractor configuration that reports body errors in the API envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(16 * 1024)
        .error_handler(|error, _request| json_payload_error(&error).into())
}
