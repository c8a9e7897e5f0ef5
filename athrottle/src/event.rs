use std::fmt;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::sync::Arc;

/// Observable counter events, delivered to the [`EventCallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// `mark_request` was called.
    Request,
    /// `mark_accept` was called.
    Accept,
    /// `reject_next` returned `true`.
    Reject,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Accept => "accept",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer for counter events, useful for logging throttle events and metrics.
///
/// The callback is invoked synchronously, once per event, after the counter's lock has
/// been released.
pub type EventCallback = Arc<dyn Fn(Event) + Send + Sync>;

/// Fires events at an optional callback without letting it fail the caller.
#[derive(Clone, Default)]
pub(crate) struct Notifier {
    callback: Option<EventCallback>,
}

impl Notifier {
    pub(crate) fn new(callback: Option<EventCallback>) -> Self {
        Self { callback }
    }

    pub(crate) fn notify(&self, event: Event) {
        let Some(callback) = &self.callback else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
            tracing::warn!(%event, "throttle event callback panicked");
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
