use std::marker::PhantomData;
use std::time::Duration;

use athrottle::Throttle;
use tower::BoxError;
use tower::Layer;
use tower::Service;
use tower::util::BoxCloneSyncService;

use crate::AdaptiveThrottleLayer;
use crate::ThrottleError;
use crate::classify::Classify;
use crate::classify::StatusClassifier;
use crate::status::Status;

/// A pre-composed adaptive throttling stack.
///
/// ### Error Responsibilities:
/// - **Throttling (`ThrottleError::Throttled`)**: the throttle shed the call locally.
///   This is near-instant and the inner service is never contacted.
/// - **Timeout (`ThrottleError::Timeout`)**: the *inner service* took longer than
///   `max_wait`. The timeout sits inside the throttle, so a slow backend counts as an
///   overloaded one.
/// - **Status**: [`Status`] errors from the inner service are passed through untouched.
/// - **Inner (`ThrottleError::Inner`)**: any other inner service error.
pub struct ManagedThrottleLayer<T, Req, C = StatusClassifier> {
    throttle: T,
    classifier: C,
    max_wait: Duration,
    _phantom: PhantomData<fn(Req)>,
}

// Deriving Clone would require `Req: Clone`, which breaks the layer with Axum.
impl<T, Req, C> Clone for ManagedThrottleLayer<T, Req, C>
where
    T: Clone,
    C: Clone,
{
    fn clone(&self) -> Self {
        Self {
            throttle: self.throttle.clone(),
            classifier: self.classifier.clone(),
            max_wait: self.max_wait,
            _phantom: PhantomData,
        }
    }
}

impl<S, T, Req, C> Layer<S> for ManagedThrottleLayer<T, Req, C>
where
    T: Throttle + Clone + 'static,
    C: Classify<S::Response> + Clone + Send + Sync + 'static,
    S: Service<Req, Error = BoxError> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
    S::Response: 'static,
    Req: Send + 'static,
{
    type Service = BoxCloneSyncService<Req, S::Response, BoxError>;

    fn layer(&self, inner: S) -> Self::Service {
        let throttle = AdaptiveThrottleLayer::new(self.throttle.clone())
            .with_classifier(self.classifier.clone());

        let svc = tower::ServiceBuilder::new()
            .map_err(|err: BoxError| {
                if err.is::<tower::timeout::error::Elapsed>() {
                    BoxError::from(ThrottleError::Timeout)
                } else if err.is::<ThrottleError>() || err.is::<Status>() {
                    err
                } else {
                    // Wrap any other inner service errors
                    Box::from(ThrottleError::Inner(err.to_string()))
                }
            })
            .layer(throttle)
            .timeout(self.max_wait)
            .service(inner);

        BoxCloneSyncService::new(svc)
    }
}

impl<T: Throttle, Req> ManagedThrottleLayer<T, Req> {
    pub fn new(throttle: T, max_wait: Duration) -> Self {
        Self {
            throttle,
            classifier: StatusClassifier,
            max_wait,
            _phantom: PhantomData,
        }
    }
}

impl<T: Throttle, Req, C> ManagedThrottleLayer<T, Req, C> {
    pub fn with_classifier<C2>(self, classifier: C2) -> ManagedThrottleLayer<T, Req, C2> {
        ManagedThrottleLayer {
            throttle: self.throttle,
            classifier,
            max_wait: self.max_wait,
            _phantom: PhantomData,
        }
    }
}
