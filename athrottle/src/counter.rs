use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use quanta::Clock;
use quanta::Instant;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::Throttle;
use crate::config::CounterConfig;
use crate::config::ThrottleOptions;
use crate::error::ConfigError;
use crate::event::Event;
use crate::event::Notifier;
use crate::window::Totals;
use crate::window::Window;

/// Probability that the next request is rejected, given the window totals.
///
/// ```norust
/// max(0, requests - k * accepts) / (requests + 1)
/// ```
pub fn reject_probability(requests: u64, accepts: u64, overload_ratio: f64) -> f64 {
    let requests = requests as f64;
    let inflight = requests - overload_ratio * accepts as f64;
    inflight.max(0.0) / (requests + 1.0)
}

/// Everything guarded by the counter's lock, including the random source.
#[derive(Debug)]
struct State {
    window: Window,
    rng: StdRng,
    /// Number of whole bin durations elapsed since `anchor` at the last rotation.
    tick: u64,
}

/// A sliding window adaptive throttling counter.
///
/// Outbound calls are recorded with [`AdaptiveCounter::mark_request`] and their
/// successful completions with [`AdaptiveCounter::mark_accept`].
/// [`AdaptiveCounter::reject_next`] then sheds a fraction of new calls once requests
/// outpace accepts scaled by the overload ratio.
///
/// The window rotates once per bin duration. Rotation is applied lazily by whichever
/// operation first observes that a bin boundary has passed, so the counter owns no
/// background task and releases everything on drop.
pub struct AdaptiveCounter {
    state: Mutex<State>,
    bin_ns: u64,
    min_request_threshold: u64,
    overload_ratio: f64,
    notifier: Notifier,
    config: CounterConfig,
    clock: Clock,
    anchor: Instant,
}

impl AdaptiveCounter {
    /// Builds a counter, validating `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the bin count or bin duration is zero, or if the
    /// overload ratio is negative or not finite.
    pub fn new(config: CounterConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Clock::new())
    }

    /// Builds a counter that reads time from `clock`.
    pub fn with_clock(config: CounterConfig, clock: Clock) -> Result<Self, ConfigError> {
        config.validate()?;
        let bin_count = NonZeroUsize::new(config.bin_count).ok_or(ConfigError::ZeroBinCount)?;
        let bin_ns = u64::try_from(config.bin_duration.as_nanos())
            .unwrap_or(u64::MAX)
            .max(1);
        let anchor = clock.now();

        tracing::debug!(
            bins = config.bin_count,
            bin_duration = ?config.bin_duration,
            min_request_threshold = config.min_request_threshold,
            overload_ratio = config.overload_ratio,
            "created adaptive throttle counter"
        );

        Ok(Self {
            state: Mutex::new(State {
                window: Window::new(bin_count),
                rng: StdRng::seed_from_u64(config.seed),
                tick: 0,
            }),
            bin_ns,
            min_request_threshold: config.min_request_threshold,
            overload_ratio: config.overload_ratio,
            notifier: Notifier::new(config.on_event.clone()),
            config,
            clock,
            anchor,
        })
    }

    /// Builds a counter from interceptor level options.
    pub fn from_options(options: &ThrottleOptions) -> Result<Self, ConfigError> {
        Self::new(options.to_counter_config()?)
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    /// Records an outbound request in the current bin.
    pub fn mark_request(&self) {
        self.lock().window.mark_request();
        self.notifier.notify(Event::Request);
    }

    /// Records an accepted request in the current bin.
    pub fn mark_accept(&self) {
        self.lock().window.mark_accept();
        self.notifier.notify(Event::Accept);
    }

    /// Decides whether the next request should be shed.
    ///
    /// Below the cold start threshold this is always `false` and does not advance the
    /// random source. Otherwise a uniform draw from `[0, 1)` is compared against
    /// [`reject_probability`].
    pub fn reject_next(&self) -> bool {
        let reject = {
            let mut state = self.lock();
            let totals = state.window.totals();
            if totals.requests < self.min_request_threshold {
                return false;
            }
            let p = reject_probability(totals.requests, totals.accepts, self.overload_ratio);
            state.rng.random::<f64>() < p
        };

        if reject {
            self.notifier.notify(Event::Reject);
        }
        reject
    }

    /// The request and accept counts currently held by the window.
    pub fn totals(&self) -> Totals {
        self.lock().window.totals()
    }

    /// Acquires the state lock and brings the window up to date with the clock.
    fn lock(&self) -> MutexGuard<'_, State> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let elapsed = self.clock.now().duration_since(self.anchor).as_nanos();
        let tick = u64::try_from(elapsed).unwrap_or(u64::MAX) / self.bin_ns;
        if tick > state.tick {
            let ticks = tick - state.tick;
            state.window.advance(ticks);
            state.tick = tick;
            tracing::trace!(
                ticks,
                current = state.window.current_index(),
                "rotated throttle window"
            );
        }
        state
    }
}

impl Throttle for AdaptiveCounter {
    fn reject_next(&self) -> bool {
        AdaptiveCounter::reject_next(self)
    }

    fn mark_request(&self) {
        AdaptiveCounter::mark_request(self)
    }

    fn mark_accept(&self) {
        AdaptiveCounter::mark_accept(self)
    }
}

impl fmt::Debug for AdaptiveCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveCounter")
            .field("bins", &self.config.bin_count)
            .field("bin_duration", &self.config.bin_duration)
            .field("min_request_threshold", &self.min_request_threshold)
            .field("overload_ratio", &self.overload_ratio)
            .finish_non_exhaustive()
    }
}
