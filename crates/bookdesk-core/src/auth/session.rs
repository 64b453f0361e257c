//! Session state for the portal UI.
//!
//! `SessionContext` owns the two session flags and is their only writer.
//! UI code reads them directly or subscribes to changes. Navigation (used on
//! logout) is injected as a `Navigator` rather than reached globally.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::clock::{Clock, SystemClock};

use super::claims::decode_claims;
use super::TokenStore;

/// Route the session sends the user to after logging out
pub const LOGIN_ROUTE: &str = "/login";

/// Something that can move the UI to another route.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Outcome of `SessionContext::check_login`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStatus {
    /// No token stored
    Anonymous,
    /// Token could not be decoded; it has been removed
    Malformed,
    /// Token had expired; the session was logged out
    Expired,
    /// Token is present and not expired
    Active { expires_at: Option<DateTime<Utc>> },
}

impl LoginStatus {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, LoginStatus::Active { .. })
    }
}

pub struct SessionContext {
    tokens: TokenStore,
    api: ApiClient,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
    logged_in: watch::Sender<bool>,
    admin: watch::Sender<bool>,
}

impl SessionContext {
    pub fn new(tokens: TokenStore, api: ApiClient, navigator: Arc<dyn Navigator>) -> Self {
        Self::with_clock(tokens, api, navigator, Arc::new(SystemClock))
    }

    pub fn with_clock(
        tokens: TokenStore,
        api: ApiClient,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (logged_in, _) = watch::channel(false);
        let (admin, _) = watch::channel(false);
        Self {
            tokens,
            api,
            navigator,
            clock,
            logged_in,
            admin,
        }
    }

    // =========================================================================
    // Flags
    // =========================================================================

    pub fn is_logged_in(&self) -> bool {
        *self.logged_in.borrow()
    }

    pub fn is_admin(&self) -> bool {
        *self.admin.borrow()
    }

    pub fn subscribe_logged_in(&self) -> watch::Receiver<bool> {
        self.logged_in.subscribe()
    }

    pub fn subscribe_admin(&self) -> watch::Receiver<bool> {
        self.admin.subscribe()
    }

    fn set_logged_in(&self, value: bool) {
        self.logged_in.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }

    fn set_admin(&self, value: bool) {
        self.admin.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Re-derive `is_logged_in` from the stored token.
    pub fn check_login(&self) -> LoginStatus {
        let Some(token) = self.tokens.get_token() else {
            self.set_logged_in(false);
            return LoginStatus::Anonymous;
        };

        let claims = match decode_claims(&token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, "Stored token is malformed, discarding it");
                self.set_logged_in(false);
                if let Err(e) = self.tokens.remove_token() {
                    warn!(error = %e, "Failed to remove malformed token");
                }
                return LoginStatus::Malformed;
            }
        };

        let now = self.clock.now_secs();
        if claims.is_expired_at(now) {
            warn!(exp = claims.exp, now, "Token expired, logging out");
            self.logout();
            return LoginStatus::Expired;
        }

        debug!(exp = claims.exp, "Token valid");
        self.set_logged_in(true);
        LoginStatus::Active {
            expires_at: claims.expires_at(),
        }
    }

    /// Ask the backend whether the current user is an administrator.
    /// On failure `is_admin` keeps its previous value.
    pub async fn check_admin(&self) -> Result<bool, ApiError> {
        match self.api.fetch_current_user().await {
            Ok(user) => {
                debug!(is_admin = user.is_admin, "Fetched current user");
                self.set_admin(user.is_admin);
                Ok(user.is_admin)
            }
            Err(e) => {
                warn!(error = %e, "Admin check failed");
                Err(e)
            }
        }
    }

    /// Drop the credential, clear both flags and go to the login page.
    pub fn logout(&self) {
        if let Err(e) = self.tokens.remove_token() {
            warn!(error = %e, "Failed to remove token on logout");
        }
        self.set_logged_in(false);
        self.set_admin(false);
        info!("Logged out");
        self.navigator.navigate(LOGIN_ROUTE);
    }

    /// Store a freshly issued token and re-check the session with it
    pub fn login_with_token(&self, token: &str) -> anyhow::Result<LoginStatus> {
        self.tokens.set_token(token.trim())?;
        let status = self.check_login();
        if status.is_logged_in() {
            info!("Logged in");
        }
        Ok(status)
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }
}
