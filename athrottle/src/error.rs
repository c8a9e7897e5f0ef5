use std::time::Duration;

/// Errors produced when a counter is built from invalid configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The window must contain at least one bin.
    #[error("bin count must be greater than zero")]
    ZeroBinCount,

    /// Bins must span a non-zero amount of time.
    #[error("bin duration must be greater than zero")]
    ZeroBinDuration,

    /// The overload ratio must be a finite, non-negative number.
    #[error("the overload ratio ({0}) must be a finite value greater or equal than 0.0")]
    InvalidOverloadRatio(f64),

    /// The window holds more bins than a counter will allocate.
    #[error("bin count {bins} exceeds the maximum of {max}")]
    TooManyBins { bins: u128, max: usize },

    /// The window is shorter than a single bin.
    #[error("window duration {window:?} is shorter than the bin granularity {granularity:?}")]
    WindowTooShort {
        window: Duration,
        granularity: Duration,
    },
}
