//! # visa-portal
//!
//! Client-side session core for the visa-request platform: who is signed in,
//! with which role, and where each role is allowed to navigate.
//!
//! The crate holds the Session Store (login, registration, federated sign-in,
//! logout, password reset), the Navigation Guard evaluated before every route
//! transition, and the collaborators they talk to: the REST API, the
//! federated identity provider, durable key-value storage, and the
//! notification sink.

pub mod app;
pub mod config;
pub mod error;
pub mod identity;
pub mod nav;
pub mod net;
pub mod notify;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;
