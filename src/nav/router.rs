//! Router driving route transitions through the navigation guard.

#[cfg(test)]
#[path = "router_test.rs"]
mod router_test;

use tokio::sync::watch;

use super::guard::{self, NavDecision};
use super::routes::{Location, RouteName, RouteTable};
use crate::error::NavigationError;
use crate::state::session::SessionHandle;

/// Consecutive guard redirects tolerated before a transition is abandoned.
pub const MAX_REDIRECTS: usize = 4;

/// Something that can move the application to a new location.
pub trait Navigator: Send + Sync {
    /// Navigate to `to`, returning the location actually reached after the
    /// guard ran.
    ///
    /// # Errors
    ///
    /// Fails on unknown routes, missing path parameters, or redirect loops.
    fn push(&self, to: Location) -> Result<Location, NavigationError>;

    fn current(&self) -> Location;
}

pub struct Router {
    table: RouteTable,
    session: SessionHandle,
    current: watch::Sender<Location>,
}

impl Router {
    /// Create a router positioned at the home page.
    #[must_use]
    pub fn new(table: RouteTable, session: SessionHandle) -> Self {
        Self { table, session, current: watch::Sender::new(Location::named(RouteName::HOME)) }
    }

    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Location> {
        self.current.subscribe()
    }

    /// Run the guard for `to` without moving, following redirects.
    ///
    /// # Errors
    ///
    /// See [`Navigator::push`].
    pub fn resolve(&self, to: Location) -> Result<Location, NavigationError> {
        let session = self.session.snapshot();
        let requested = to.name.clone();
        let mut target = to;

        for _ in 0..=MAX_REDIRECTS {
            let record = self
                .table
                .get(&target.name)
                .ok_or_else(|| NavigationError::UnknownRoute(target.name.to_string()))?;

            match guard::evaluate(&target.name, &record.meta, &session) {
                NavDecision::Allow => {
                    self.table.href(&target)?;
                    return Ok(target);
                }
                NavDecision::Redirect(next) => {
                    tracing::debug!(from = %target.name, to = %next, "guard redirect");
                    target = Location::named(next);
                }
            }
        }

        Err(NavigationError::RedirectLoop(requested.to_string()))
    }

    /// Navigate to a concrete path such as `/admin/users`.
    ///
    /// # Errors
    ///
    /// Fails when no route matches, then as [`Navigator::push`].
    pub fn push_path(&self, path: &str) -> Result<Location, NavigationError> {
        let location = self.table.match_path(path)?;
        self.push(location)
    }

    /// Path of the current location.
    #[must_use]
    pub fn current_path(&self) -> Option<String> {
        self.table.href(&self.current.borrow()).ok()
    }
}

impl Navigator for Router {
    fn push(&self, to: Location) -> Result<Location, NavigationError> {
        let requested = to.name.clone();
        let reached = self.resolve(to)?;
        if reached.name != requested {
            tracing::info!(requested = %requested, reached = %reached.name, "navigation redirected");
        }
        self.current.send_replace(reached.clone());
        Ok(reached)
    }

    fn current(&self) -> Location {
        self.current.borrow().clone()
    }
}
