//! Navigation guard evaluated before every route transition.
//!
//! Rules, in order:
//! 1. Destination requires auth and the session is not authenticated:
//!    go to login.
//! 2. Destination is login or registration and the session is
//!    authenticated: go to the role's dashboard.
//! 3. Destination restricts roles and the session's role is not listed:
//!    go to the role's dashboard (never to login).
//! 4. Otherwise allow.
//!
//! A rule whose target equals the destination does not fire; evaluation
//! falls through to the next rule instead of redirecting in place.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use super::routes::{RouteMeta, RouteName, dashboard_for};
use crate::state::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavDecision {
    Allow,
    Redirect(RouteName),
}

/// Decide whether a transition to `to` may proceed.
#[must_use]
pub fn evaluate(to: &RouteName, meta: &RouteMeta, session: &Session) -> NavDecision {
    let role = session.authenticated_role();

    if meta.requires_auth && role.is_none() {
        if let Some(decision) = redirect_unless_at(to, RouteName::LOGIN) {
            return decision;
        }
    }

    let Some(role) = role else {
        return NavDecision::Allow;
    };

    if to.is_auth_entry() {
        if let Some(decision) = redirect_unless_at(to, dashboard_for(Some(role))) {
            return decision;
        }
    }

    if let Some(allowed) = &meta.roles {
        if !allowed.contains(&role) {
            if let Some(decision) = redirect_unless_at(to, dashboard_for(Some(role))) {
                return decision;
            }
        }
    }

    NavDecision::Allow
}

fn redirect_unless_at(to: &RouteName, target: RouteName) -> Option<NavDecision> {
    (*to != target).then_some(NavDecision::Redirect(target))
}
