use tracing::debug;

use crate::auth::session::LOGIN_ROUTE;
use crate::auth::TokenStore;

use super::route::RouteMatch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

/// Runs before every route transition.
pub trait NavigationGuard: Send + Sync {
    fn before_each(&self, to: &RouteMatch) -> GuardDecision;
}

/// Sends navigations to protected routes to the login page when no token is stored.
///
/// Only the presence of a token is checked. An expired token still passes;
/// `SessionContext::check_login` is where expiry is enforced, and the backend
/// rejects the token on the next request.
pub struct AuthGuard {
    tokens: TokenStore,
}

impl AuthGuard {
    pub fn new(tokens: TokenStore) -> Self {
        Self { tokens }
    }
}

impl NavigationGuard for AuthGuard {
    fn before_each(&self, to: &RouteMatch) -> GuardDecision {
        let is_authenticated = self.tokens.has_token();
        if to.requires_auth() && !is_authenticated {
            debug!(path = %to.path, "Protected route without token, redirecting");
            GuardDecision::Redirect(LOGIN_ROUTE.to_string())
        } else {
            GuardDecision::Allow
        }
    }
}
