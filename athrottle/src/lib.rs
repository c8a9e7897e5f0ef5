//! # athrottle
//!
//! `athrottle` implements client-side adaptive throttling as described in the
//! [Handling Overload](https://sre.google/sre-book/handling-overload/) chapter of the
//! SRE book.
//!
//! ## Core Philosophy
//!
//! A client that keeps retrying against an overloaded backend makes the overload worse.
//! Instead of enforcing a fixed quota, an [`AdaptiveCounter`] watches how many requests it
//! sent and how many the backend accepted over a sliding window, and starts rejecting a
//! fraction of new requests locally once requests outpace accepts:
//!
//! ```norust
//! reject_probability = max(0, requests - k * accepts) / (requests + 1)
//! ```
//!
//! ## Key Concepts
//!
//! * **Sliding Window**: counts live in a ring of fixed-duration bins. The oldest bin is
//!   cleared each time the window advances, so stale traffic ages out.
//! * **Lazy Rotation**: bins are rotated at the moment of an operation from the elapsed
//!   clock time, eliminating the need for background worker threads or timers.
//! * **Cold Start**: no request is rejected until `min_request_threshold` requests have been
//!   observed inside the window.
//! * **Deterministic**: the random source is seeded, so a given sequence of operations always
//!   produces the same decisions.
//!
//! ## Example
//!
//! ```rust
//! use athrottle::AdaptiveCounter;
//! use athrottle::CounterConfig;
//! use std::time::Duration;
//!
//! let config = CounterConfig::new(18, Duration::from_secs(10))
//!     .with_min_request_threshold(25)
//!     .with_overload_ratio(2.0)
//!     .with_seed(7);
//! let counter = AdaptiveCounter::new(config)?;
//!
//! if !counter.reject_next() {
//!     counter.mark_request();
//!     // ... issue the call ...
//!     counter.mark_accept();
//! }
//! # Ok::<(), athrottle::ConfigError>(())
//! ```

use std::fmt::Debug;

mod config;
mod counter;
mod error;
mod event;
mod window;

pub use config::BIN_GRANULARITY;
pub use config::MAX_BIN_COUNT;
pub use config::CounterConfig;
pub use config::ThrottleOptions;
pub use counter::AdaptiveCounter;
pub use counter::reject_probability;
pub use error::ConfigError;
pub use event::Event;
pub use event::EventCallback;
pub use window::Bin;
pub use window::Totals;
pub use window::Window;

/// The admission interface consumed by interceptors.
///
/// Implementations must be `Send` and `Sync` to allow sharing across thread boundaries
/// via `Arc`.
pub trait Throttle: Debug + Send + Sync {
    /// Decides whether the next outbound call should be shed locally.
    ///
    /// Returns `true` if the call must not be sent.
    fn reject_next(&self) -> bool;

    /// Records that an outbound call was issued.
    fn mark_request(&self);

    /// Records that an issued call was accepted by the backend.
    fn mark_accept(&self);
}

impl<T> Throttle for std::sync::Arc<T>
where
    T: Throttle + ?Sized,
{
    fn reject_next(&self) -> bool {
        (**self).reject_next()
    }

    fn mark_request(&self) {
        (**self).mark_request()
    }

    fn mark_accept(&self) {
        (**self).mark_accept()
    }
}
