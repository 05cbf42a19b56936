//! Navigation: the route map, the guard evaluated before every transition,
//! and the router that drives transitions.
//!
//! DESIGN
//! ======
//! The guard is a pure function of (destination, session). The router owns
//! the current location and is the only caller of the guard, so every
//! transition, whether requested by a page, a session action, or the HTTP
//! client's 401 handling, passes through the same rules.

pub mod guard;
pub mod router;
pub mod routes;

pub use guard::{NavDecision, evaluate};
pub use router::{Navigator, Router};
pub use routes::{Location, RouteMeta, RouteName, RouteRecord, RouteTable, dashboard_for};
