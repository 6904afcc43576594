//! DVLA outbound adapters.
//!
//! This module provides a thin HTTP implementation of the
//! `VehicleLookupSource` port over the Vehicle Enquiry Service.

mod dto;
mod http_source;

pub use http_source::DvlaHttpSource;
