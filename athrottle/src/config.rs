use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;
use crate::event::Event;
use crate::event::EventCallback;

/// The width of a single bin when a counter is derived from a window duration.
pub const BIN_GRANULARITY: Duration = Duration::from_secs(10);

/// The largest number of bins a counter will allocate.
pub const MAX_BIN_COUNT: usize = 1 << 20;

/// Construction parameters for an [`AdaptiveCounter`](crate::AdaptiveCounter).
///
/// Nothing is validated until the counter is built.
#[derive(Clone)]
pub struct CounterConfig {
    pub(crate) bin_count: usize,
    pub(crate) bin_duration: Duration,
    pub(crate) min_request_threshold: u64,
    pub(crate) overload_ratio: f64,
    pub(crate) seed: u64,
    pub(crate) on_event: Option<EventCallback>,
}

impl CounterConfig {
    /// Creates a configuration for a window of `bin_count` bins, each `bin_duration` wide.
    ///
    /// Defaults: no cold start threshold, an overload ratio of `2.0`, seed `0` and no
    /// event callback.
    pub fn new(bin_count: usize, bin_duration: Duration) -> Self {
        Self {
            bin_count,
            bin_duration,
            min_request_threshold: 0,
            overload_ratio: 2.0,
            seed: 0,
            on_event: None,
        }
    }

    /// Number of requests that must be present within the window before throttling.
    pub fn with_min_request_threshold(mut self, threshold: u64) -> Self {
        self.min_request_threshold = threshold;
        self
    }

    /// Multiplier `k` applied to accepts before they are weighed against requests.
    ///
    /// Lower values throttle more aggressively.
    pub fn with_overload_ratio(mut self, ratio: f64) -> Self {
        self.overload_ratio = ratio;
        self
    }

    /// Seed of the random source used by admission decisions.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Observer for request, accept and reject events.
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        self.on_event = Some(std::sync::Arc::new(callback));
        self
    }

    /// Like [`CounterConfig::with_callback`], sharing an existing callback.
    pub fn with_shared_callback(mut self, callback: EventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    pub fn bin_duration(&self) -> Duration {
        self.bin_duration
    }

    pub fn min_request_threshold(&self) -> u64 {
        self.min_request_threshold
    }

    pub fn overload_ratio(&self) -> f64 {
        self.overload_ratio
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The span of traffic covered by the whole window.
    pub fn window_duration(&self) -> Duration {
        self.bin_duration
            .saturating_mul(u32::try_from(self.bin_count).unwrap_or(u32::MAX))
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.bin_count == 0 {
            return Err(ConfigError::ZeroBinCount);
        }
        if self.bin_count > MAX_BIN_COUNT {
            return Err(ConfigError::TooManyBins {
                bins: self.bin_count as u128,
                max: MAX_BIN_COUNT,
            });
        }
        if self.bin_duration.is_zero() {
            return Err(ConfigError::ZeroBinDuration);
        }
        if !self.overload_ratio.is_finite() || self.overload_ratio < 0.0 {
            return Err(ConfigError::InvalidOverloadRatio(self.overload_ratio));
        }
        Ok(())
    }
}

impl fmt::Debug for CounterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CounterConfig")
            .field("bin_count", &self.bin_count)
            .field("bin_duration", &self.bin_duration)
            .field("min_request_threshold", &self.min_request_threshold)
            .field("overload_ratio", &self.overload_ratio)
            .field("seed", &self.seed)
            .field("on_event", &self.on_event.is_some())
            .finish()
    }
}

/// High level options for the adaptive throttling logic, as consumed by interceptors.
#[derive(Clone)]
pub struct ThrottleOptions {
    /// Sliding window used to calculate the throttle ratio.
    pub window_duration: Duration,
    /// Number of requests that must be present within `window_duration` before throttling.
    pub min_request_count: u64,
    /// Ratio of requests to accepts that must be met before throttling begins.
    pub max_ratio: f64,
    /// Fixed seed for the decision source. A random seed is drawn when `None`.
    pub seed: Option<u64>,
    /// Callback for counter events.
    pub callback: Option<EventCallback>,
}

impl Default for ThrottleOptions {
    /// Recommended defaults: a three minute window, 25 requests before throttling and a
    /// ratio of `2.0`.
    fn default() -> Self {
        Self {
            window_duration: Duration::from_secs(3 * 60),
            min_request_count: 25,
            max_ratio: 2.0,
            seed: None,
            callback: None,
        }
    }
}

impl ThrottleOptions {
    /// Translates the options into a bin layout of [`BIN_GRANULARITY`] wide bins.
    pub fn to_counter_config(&self) -> Result<CounterConfig, ConfigError> {
        let bin_count = self.window_duration.as_nanos() / BIN_GRANULARITY.as_nanos();
        if bin_count == 0 {
            return Err(ConfigError::WindowTooShort {
                window: self.window_duration,
                granularity: BIN_GRANULARITY,
            });
        }
        let bin_count = match usize::try_from(bin_count) {
            Ok(bins) if bins <= MAX_BIN_COUNT => bins,
            _ => {
                return Err(ConfigError::TooManyBins {
                    bins: bin_count,
                    max: MAX_BIN_COUNT,
                });
            }
        };
        let seed = self.seed.unwrap_or_else(rand::random);

        let mut config = CounterConfig::new(bin_count, BIN_GRANULARITY)
            .with_min_request_threshold(self.min_request_count)
            .with_overload_ratio(self.max_ratio)
            .with_seed(seed);
        config.on_event = self.callback.clone();
        Ok(config)
    }
}

impl fmt::Debug for ThrottleOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottleOptions")
            .field("window_duration", &self.window_duration)
            .field("min_request_count", &self.min_request_count)
            .field("max_ratio", &self.max_ratio)
            .field("seed", &self.seed)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
