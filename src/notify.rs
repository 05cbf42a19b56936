//! Notification sink for user-facing toasts.
//!
//! Fire-and-forget: a sink never reports failure back to the action that
//! raised the message.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, kind: ToastKind, message: &str);

    fn success(&self, message: &str) {
        self.notify(ToastKind::Success, message);
    }

    fn error(&self, message: &str) {
        self.notify(ToastKind::Error, message);
    }

    fn info(&self, message: &str) {
        self.notify(ToastKind::Info, message);
    }
}

/// Sink that writes toasts to the tracing log. Used by the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: ToastKind, message: &str) {
        match kind {
            ToastKind::Info | ToastKind::Success => tracing::info!(?kind, "{message}"),
            ToastKind::Warning | ToastKind::Error => tracing::warn!(?kind, "{message}"),
        }
    }
}
