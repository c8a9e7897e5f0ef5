use athrottle::Throttle;
use tower::ServiceBuilder;
use tower::layer::util::Stack;

use crate::AdaptiveThrottleLayer;

/// Service Builder Extension with adaptive throttling functions for tower::ServiceBuilder.
pub trait ServiceBuilderExt<L> {
    /// Add an adaptive throttle layer using the default classifier
    fn adaptive_throttle<T>(self, throttle: T) -> ServiceBuilder<Stack<AdaptiveThrottleLayer<T>, L>>
    where
        T: Throttle + Clone;

    /// Add an adaptive throttle layer with a custom classifier
    fn classified_throttle<T, C>(
        self,
        throttle: T,
        classifier: C,
    ) -> ServiceBuilder<Stack<AdaptiveThrottleLayer<T, C>, L>>
    where
        T: Throttle + Clone;
}

impl<L> ServiceBuilderExt<L> for ServiceBuilder<L> {
    fn adaptive_throttle<T>(self, throttle: T) -> ServiceBuilder<Stack<AdaptiveThrottleLayer<T>, L>>
    where
        T: Throttle + Clone,
    {
        self.layer(AdaptiveThrottleLayer::new(throttle))
    }

    fn classified_throttle<T, C>(
        self,
        throttle: T,
        classifier: C,
    ) -> ServiceBuilder<Stack<AdaptiveThrottleLayer<T, C>, L>>
    where
        T: Throttle + Clone,
    {
        self.layer(AdaptiveThrottleLayer::new(throttle).with_classifier(classifier))
    }
}
