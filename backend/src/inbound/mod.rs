//! Inbound adapters that translate external input into domain calls while
//! keeping framework details at the edge.
//!
//! HTTP handlers live under [`http`]; CSV parsing for the bulk importer lives
//! under [`csv_import`].

pub mod csv_import;
pub mod http;
