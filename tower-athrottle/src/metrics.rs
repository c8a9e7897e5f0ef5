use std::sync::Arc;

use athrottle::Event;
use athrottle::EventCallback;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::Counter;
use opentelemetry::metrics::Meter;

/// Publishes counter events as an OpenTelemetry counter.
///
/// Each event increments `throttle_events` with an `event` attribute of `request`,
/// `accept` or `reject`.
#[derive(Clone, Debug)]
pub struct EventMetrics {
    events: Counter<u64>,
}

impl Default for EventMetrics {
    fn default() -> Self {
        Self::with_meter(&global::meter("adaptive_throttle"))
    }
}

impl EventMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_meter(meter: &Meter) -> Self {
        Self {
            events: meter
                .u64_counter("throttle_events")
                .with_description("Adaptive throttle counter events")
                .build(),
        }
    }

    pub fn record(&self, event: Event) {
        self.events.add(1, &[KeyValue::new("event", event.as_str())]);
    }

    /// Returns a callback suitable for [`athrottle::CounterConfig::with_shared_callback`].
    pub fn callback(&self) -> EventCallback {
        let metrics = self.clone();
        Arc::new(move |event| metrics.record(event))
    }
}
