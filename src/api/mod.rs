//! HTTP client module for the currency-conversion API.
//!
//! `ApiClient` covers every endpoint the service exposes: token/register
//! for authentication, convert and rates, the bearer-authenticated
//! favorites and history collections, and the read-only analytics
//! endpoints. Responses are parsed into per-endpoint schemas and converted
//! to model types on receipt.

pub mod client;
pub mod error;

pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use error::ApiError;
