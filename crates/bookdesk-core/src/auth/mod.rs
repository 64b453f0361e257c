//! Authentication module for the portal session.
//!
//! This module provides:
//! - `TokenStore`: the single persisted credential slot
//! - `Claims`: expiry decoded from the bearer token
//! - `SessionContext`: the logged-in / admin flags and the operations that
//!   change them (`check_login`, `check_admin`, `logout`)

pub mod claims;
pub mod session;
pub mod token_store;

pub use claims::{decode_claims, Claims, ClaimsError};
pub use session::{LoginStatus, Navigator, SessionContext};
pub use token_store::TokenStore;
