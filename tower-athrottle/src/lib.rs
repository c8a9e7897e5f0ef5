//! # Tower AThrottle
//!
//! `tower-athrottle` brings client-side adaptive throttling to the
//! [Tower](https://github.com/tower-rs/tower) ecosystem.
//!
//! Wrap the service that talks to a backend in an [`AdaptiveThrottleLayer`]. When the
//! backend starts shedding or failing load, requests outpace accepts and the layer begins
//! rejecting a statistically derived fraction of calls locally, failing them with
//! [`ThrottleError::Throttled`] before anything is sent.
//!
//! ## The Managed Stack
//! [`ManagedThrottleLayer`] is a pre-composed stack designed to handle common production
//! requirements:
//!
//! 1. **Throttling**: sheds calls with `ThrottleError::Throttled` when the backend is
//!    overloaded.
//! 2. **Timeouts**: fails calls with `ThrottleError::Timeout` if the inner service takes
//!    longer than a defined duration. Timed out calls count as overloaded.
//! 3. **Error Mapping**: converts internal Tower errors into a unified, cloneable
//!    [`ThrottleError`] domain, passing [`Status`] errors through.
//!
//! ## Classification
//! Completed calls are classified by a [`Classify`] implementation. The default
//! [`StatusClassifier`] counts responses and ordinary application errors as accepted,
//! and overload status codes ([`OVERLOAD_CODES`]), timeouts and unrecognised errors as
//! not accepted.
//!
//! ## Feature Flags
//!
//! - `http`: Enables [`HttpClassifier`](crate::HttpClassifier) for `http::Response`.
//! - `axum`: Enables `IntoResponse` for [`ThrottleError`], allowing automatic conversion
//!   to HTTP status codes (503, 408, 500).

mod classify;
mod error;
mod layer;
mod managed_layer;
mod metrics;
mod service;
mod status;
mod utils;


pub use athrottle::AdaptiveCounter;
pub use athrottle::ThrottleOptions;
#[cfg(feature = "http")]
pub use classify::HttpClassifier;
pub use classify::Classify;
pub use classify::ClassifyFn;
pub use classify::Outcome;
pub use classify::StatusClassifier;
pub use classify::classify_fn;
pub use error::ThrottleError;
pub use layer::AdaptiveThrottleLayer;
pub use managed_layer::ManagedThrottleLayer;
pub use metrics::EventMetrics;
pub use service::AdaptiveThrottleService;
pub use service::ResponseFuture;
pub use status::Code;
pub use status::OVERLOAD_CODES;
pub use status::Status;
pub use utils::ServiceBuilderExt;
