use std::sync::Arc;

use athrottle::AdaptiveCounter;
use athrottle::ConfigError;
use athrottle::Throttle;
use athrottle::ThrottleOptions;
use tower::Layer;

use crate::classify::StatusClassifier;
use crate::service::AdaptiveThrottleService;

/// Applies adaptive throttling to requests.
///
/// Every service produced by the layer shares the same throttle, so clones of a client
/// see one combined view of the backend.
#[derive(Debug, Clone)]
pub struct AdaptiveThrottleLayer<T, C = StatusClassifier> {
    throttle: T,
    classifier: C,
}

impl<T> AdaptiveThrottleLayer<T>
where
    T: Throttle + Clone,
{
    /// Create an AdaptiveThrottleLayer using the default [`StatusClassifier`]
    pub fn new(throttle: T) -> Self {
        AdaptiveThrottleLayer {
            throttle,
            classifier: StatusClassifier,
        }
    }
}

impl AdaptiveThrottleLayer<Arc<AdaptiveCounter>> {
    /// Create an AdaptiveThrottleLayer backed by a new counter built from `options`.
    pub fn from_options(options: &ThrottleOptions) -> Result<Self, ConfigError> {
        Ok(Self::new(Arc::new(AdaptiveCounter::from_options(options)?)))
    }
}

impl<T, C> AdaptiveThrottleLayer<T, C> {
    /// Replace the classifier deciding which outcomes count as accepted.
    pub fn with_classifier<C2>(self, classifier: C2) -> AdaptiveThrottleLayer<T, C2> {
        AdaptiveThrottleLayer {
            throttle: self.throttle,
            classifier,
        }
    }

    pub fn throttle(&self) -> &T {
        &self.throttle
    }
}

impl<T, C, S> Layer<S> for AdaptiveThrottleLayer<T, C>
where
    T: Clone,
    C: Clone,
{
    type Service = AdaptiveThrottleService<T, S, C>;

    fn layer(&self, service: S) -> Self::Service {
        AdaptiveThrottleService::with_classifier(
            service,
            self.throttle.clone(),
            self.classifier.clone(),
        )
    }
}
