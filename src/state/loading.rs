//! Loading flag and error reporting shared by session actions.
//!
//! An action takes a [`LoadingGuard`] when it starts; the flag clears when
//! the last outstanding guard drops, on every exit path including early `?`
//! returns.

#[cfg(test)]
#[path = "loading_test.rs"]
mod loading_test;

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::AuthError;
use crate::notify::Notifier;

/// Observable loading state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingStatus {
    pub active: bool,
    /// Number of actions holding a guard.
    pub in_flight: usize,
    /// Label of the most recently started action in flight.
    pub label: Option<String>,
    /// Last user-facing error message.
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct LoadingState {
    status: Arc<watch::Sender<LoadingStatus>>,
    notifier: Arc<dyn Notifier>,
}

impl LoadingState {
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { status: Arc::new(watch::Sender::new(LoadingStatus::default())), notifier }
    }

    /// Mark an action as started and clear the previous error.
    #[must_use = "the loading flag clears when the guard drops"]
    pub fn start(&self, label: &str) -> LoadingGuard {
        tracing::debug!(%label, "action started");
        self.status.send_modify(|s| {
            s.in_flight += 1;
            s.active = true;
            s.label = Some(label.to_owned());
            s.error = None;
        });
        LoadingGuard { status: Arc::clone(&self.status) }
    }

    /// Record and surface a failure. Returns the message shown to the user.
    pub fn fail(&self, err: &AuthError, fallback: &str) -> String {
        let message = err.user_message(fallback);
        tracing::warn!(error = %err, %message, "action failed");
        self.status.send_modify(|s| s.error = Some(message.clone()));
        self.notifier.error(&message);
        message
    }

    #[must_use]
    pub fn status(&self) -> LoadingStatus {
        self.status.borrow().clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status.borrow().active
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LoadingStatus> {
        self.status.subscribe()
    }
}

/// Releases one in-flight action on drop.
pub struct LoadingGuard {
    status: Arc<watch::Sender<LoadingStatus>>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.status.send_modify(|s| {
            s.in_flight = s.in_flight.saturating_sub(1);
            if s.in_flight == 0 {
                s.active = false;
                s.label = None;
            }
        });
    }
}
