//! Request middleware.

pub mod request_span;

pub use request_span::RequestSpan;
