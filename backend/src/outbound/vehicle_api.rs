//! HTTP failure mapping shared by the DVLA and DVSA adapters.
//!
//! Both APIs speak plain status codes, so one table decides how a response
//! becomes a [`VehicleLookupError`]. Callers handle 404 before reaching here.

use reqwest::StatusCode;

use crate::domain::ports::VehicleLookupError;

pub(super) fn map_transport_error(error: reqwest::Error) -> VehicleLookupError {
    if error.is_timeout() {
        VehicleLookupError::timeout(error.to_string())
    } else if error.is_decode() {
        VehicleLookupError::decode(error.to_string())
    } else {
        VehicleLookupError::transport(error.to_string())
    }
}

pub(super) fn map_status_error(status: StatusCode, body: &[u8]) -> VehicleLookupError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => VehicleLookupError::rate_limited(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            VehicleLookupError::unauthorized(message)
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            VehicleLookupError::timeout(message)
        }
        _ if status.is_client_error() => VehicleLookupError::invalid_request(message),
        _ => VehicleLookupError::transport(message),
    }
}

pub(super) fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

/// Trim upstream text, treating blanks as missing.
pub(super) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}
