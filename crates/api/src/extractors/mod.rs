//! Custom Axum extractors.

pub mod base_url;

pub use base_url::RequestBaseUrl;
