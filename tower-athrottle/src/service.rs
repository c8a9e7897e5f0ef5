use std::future::Future;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;
use std::task::ready;

use athrottle::Throttle;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::Counter;
use opentelemetry::metrics::Meter;
use pin_project_lite::pin_project;
use tower::BoxError;
use tower::Service;

use crate::classify::Classify;
use crate::classify::Outcome;
use crate::classify::StatusClassifier;
use crate::classify::classify_or_overloaded;
use crate::error::ThrottleError;

#[derive(Clone, Debug)]
struct ThrottleServiceMetrics {
    outcomes: Counter<u64>,
}

impl ThrottleServiceMetrics {
    fn new(meter: &Meter) -> Self {
        Self {
            outcomes: meter
                .u64_counter("throttle_outcomes")
                .with_description("Completed calls by classified outcome")
                .build(),
        }
    }
}

/// Sheds calls locally once the backend stops keeping up.
///
/// Every call first consults [`Throttle::reject_next`]. A rejected call fails with
/// [`ThrottleError::Throttled`] without reaching the inner service. Otherwise the call is
/// marked as a request, forwarded, and marked as accepted if the classifier accepts its
/// outcome. A response future dropped before completion is never marked as accepted.
#[derive(Clone, Debug)]
pub struct AdaptiveThrottleService<T, S, C = StatusClassifier> {
    inner: S,
    throttle: T,
    classifier: C,
    instruments: ThrottleServiceMetrics,
}

struct Completion<T, C> {
    throttle: T,
    classifier: C,
    outcomes: Counter<u64>,
}

impl<T, C> Completion<T, C>
where
    T: Throttle,
{
    fn record<Resp>(self, result: Result<&Resp, &BoxError>)
    where
        C: Classify<Resp>,
    {
        let outcome = classify_or_overloaded(&self.classifier, result);
        self.outcomes.add(1, &[KeyValue::new("outcome", outcome.as_str())]);
        if outcome == Outcome::Accepted {
            self.throttle.mark_accept();
        }
    }
}

pin_project! {
    /// The response future of an [`AdaptiveThrottleService`].
    pub struct ResponseFuture<F, T, C> {
        #[pin]
        inner: Option<F>,
        completion: Option<Completion<T, C>>,
    }
}

impl<F, T, C> ResponseFuture<F, T, C> {
    fn throttled() -> Self {
        Self {
            inner: None,
            completion: None,
        }
    }
}

impl<F, T, C, Resp> Future for ResponseFuture<F, T, C>
where
    F: Future<Output = Result<Resp, BoxError>>,
    T: Throttle,
    C: Classify<Resp>,
{
    type Output = Result<Resp, BoxError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let Some(inner) = this.inner.as_pin_mut() else {
            return Poll::Ready(Err(Box::new(ThrottleError::Throttled)));
        };

        let result = ready!(inner.poll(cx));
        if let Some(completion) = this.completion.take() {
            completion.record(result.as_ref());
        }
        Poll::Ready(result)
    }
}

impl<T, S, C, Req> Service<Req> for AdaptiveThrottleService<T, S, C>
where
    T: Throttle + Clone,
    S: Service<Req, Error = BoxError>,
    C: Classify<S::Response> + Clone,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = ResponseFuture<S::Future, T, C>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        if self.throttle.reject_next() {
            tracing::debug!(throttle = ?self.throttle, "client request throttled");
            return ResponseFuture::throttled();
        }

        self.throttle.mark_request();
        ResponseFuture {
            inner: Some(self.inner.call(req)),
            completion: Some(Completion {
                throttle: self.throttle.clone(),
                classifier: self.classifier.clone(),
                outcomes: self.instruments.outcomes.clone(),
            }),
        }
    }
}

impl<T, S> AdaptiveThrottleService<T, S> {
    pub fn new(inner: S, throttle: T) -> Self {
        Self::with_classifier(inner, throttle, StatusClassifier)
    }
}

impl<T, S, C> AdaptiveThrottleService<T, S, C> {
    pub fn with_classifier(inner: S, throttle: T, classifier: C) -> Self {
        Self {
            inner,
            throttle,
            classifier,
            instruments: ThrottleServiceMetrics::new(&global::meter("adaptive_throttle_service")),
        }
    }

    /// Records outcomes with `meter` instead of the global meter provider.
    pub fn with_meter(mut self, meter: &Meter) -> Self {
        self.instruments = ThrottleServiceMetrics::new(meter);
        self
    }

    pub fn throttle(&self) -> &T {
        &self.throttle
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}
