//! DVSA outbound adapters.
//!
//! This module implements the `VehicleLookupSource` port over the MOT history
//! API, including the OAuth2 token cache it needs.

mod dto;
mod http_source;
mod token;

pub use http_source::{DvsaHttpConfig, DvsaHttpSource};
pub use token::{DvsaCredentials, DvsaTokenCache};
