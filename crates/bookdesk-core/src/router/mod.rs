//! Client-side router for the portal pages.
//!
//! The router resolves paths against the route table, runs the navigation
//! guards before every transition and keeps the current location and a
//! back-stack.

pub mod guard;
pub mod route;

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::auth::{Navigator, TokenStore};

pub use guard::{AuthGuard, GuardDecision, NavigationGuard};
pub use route::{default_routes, normalize_path, Route, RouteMatch};

/// Outcome of a navigation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Landed on the requested route
    Allowed(RouteMatch),
    /// A guard sent the navigation elsewhere; landed on `to`
    Redirected { from: String, to: RouteMatch },
    /// A guard redirected to a target that is unknown or itself redirected; location unchanged
    Blocked { from: String, to: String },
    /// No route matches; location unchanged
    NotFound(String),
}

impl Navigation {
    /// The route the router ended up on, if the location changed
    pub fn landed_on(&self) -> Option<&RouteMatch> {
        match self {
            Navigation::Allowed(m) | Navigation::Redirected { to: m, .. } => Some(m),
            Navigation::Blocked { .. } | Navigation::NotFound(_) => None,
        }
    }
}

#[derive(Default)]
struct Location {
    current: Option<RouteMatch>,
    history: Vec<RouteMatch>,
}

pub struct Router {
    routes: Vec<Route>,
    guards: Vec<Arc<dyn NavigationGuard>>,
    location: Mutex<Location>,
}

impl Router {
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes,
            guards: Vec::new(),
            location: Mutex::new(Location::default()),
        }
    }

    /// The portal's routes, guarded by the token store
    pub fn with_defaults(tokens: TokenStore) -> Self {
        Self::new(default_routes()).with_guard(Arc::new(AuthGuard::new(tokens)))
    }

    pub fn with_guard(mut self, guard: Arc<dyn NavigationGuard>) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        self.routes.iter().find_map(|route| {
            route.matches(path).map(|params| RouteMatch {
                route: route.clone(),
                path: normalize_path(path),
                params,
            })
        })
    }

    pub fn current(&self) -> Option<RouteMatch> {
        self.lock().current.clone()
    }

    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    /// Navigate to `path`, recording the previous location for `back`
    pub fn push(&self, path: &str) -> Navigation {
        self.transition(path, true)
    }

    /// Return to the previous location. Guards run again on the way back;
    /// the history entry is only consumed if the router lands somewhere.
    pub fn back(&self) -> Option<Navigation> {
        let previous = self.lock().history.last().cloned()?;
        let outcome = self.transition(&previous.path, false);
        if outcome.landed_on().is_some() {
            self.lock().history.pop();
        }
        Some(outcome)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Location> {
        self.location.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn run_guards(&self, to: &RouteMatch) -> GuardDecision {
        for guard in &self.guards {
            if let GuardDecision::Redirect(target) = guard.before_each(to) {
                return GuardDecision::Redirect(target);
            }
        }
        GuardDecision::Allow
    }

    fn transition(&self, path: &str, record: bool) -> Navigation {
        let Some(target) = self.resolve(path) else {
            warn!(path, "No route matches");
            return Navigation::NotFound(path.to_string());
        };

        let outcome = match self.run_guards(&target) {
            GuardDecision::Allow => Navigation::Allowed(target),
            GuardDecision::Redirect(to) => match self.resolve(&to) {
                // One hop only: a redirect target must itself be allowed
                Some(redirected) if self.run_guards(&redirected) == GuardDecision::Allow => {
                    Navigation::Redirected {
                        from: target.path,
                        to: redirected,
                    }
                }
                _ => {
                    warn!(from = %target.path, to = %to, "Redirect target rejected");
                    Navigation::Blocked { from: target.path, to }
                }
            },
        };

        if let Some(landed) = outcome.landed_on() {
            let mut location = self.lock();
            let previous = location.current.replace(landed.clone());
            if let Some(previous) = previous {
                if record && previous.path != landed.path {
                    location.history.push(previous);
                }
            }
            debug!(path = %landed.path, route = landed.route.name, "Navigated");
        }
        outcome
    }
}

impl Navigator for Router {
    fn navigate(&self, path: &str) {
        self.push(path);
    }
}
