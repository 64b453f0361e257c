//! Core library for bookdesk, the client side of the booking/admin portal.
//!
//! - `storage`: persistent key/value backends (file, OS keychain, memory)
//! - `auth`: the credential slot, token claims and the session context
//! - `api`: HTTP client that attaches the bearer token to every request
//! - `router`: route table and the navigation guard for protected pages
//! - `config`: application configuration

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod router;
pub mod storage;

pub use api::{ApiClient, ApiError};
pub use auth::{SessionContext, TokenStore};
pub use config::Config;
pub use router::Router;
