//! Session-side state: the session record, its lifecycle actions, and the
//! loading flag those actions drive.
//!
//! DESIGN
//! ======
//! `SessionHandle` is the single owned session, shared by the router (which
//! reads it before every transition), the HTTP client (which reads the
//! bearer token and clears it on 401), and the `SessionStore` actions.

pub mod loading;
pub mod session;
pub mod store;
pub mod users;

pub use loading::{LoadingGuard, LoadingState, LoadingStatus};
pub use session::{Session, SessionHandle};
pub use store::SessionStore;
pub use users::UserDirectory;
