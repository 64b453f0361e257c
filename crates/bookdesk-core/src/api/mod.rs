//! REST API client module for the booking portal backend.
//!
//! Every request goes through one preprocessing hook that reads the stored
//! credential and, when present, sends it as a bearer token.

pub mod client;
pub mod error;

pub use client::{ApiClient, CurrentUser};
pub use error::ApiError;
