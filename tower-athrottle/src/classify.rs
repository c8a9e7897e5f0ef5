use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;

use tower::BoxError;

use crate::status::Status;

/// How a completed call is counted by the throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The backend accepted the call, including calls that failed for application reasons.
    Accepted,
    /// The backend shed or failed the load, or the failure could not be classified.
    Overloaded,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Overloaded => "overloaded",
        }
    }
}

/// Decides whether a completed call counts as accepted.
pub trait Classify<Resp> {
    fn classify(&self, outcome: Result<&Resp, &BoxError>) -> Outcome;
}

/// The default classifier.
///
/// * Responses are accepted.
/// * A [`Status`] error is overloaded when its code is an overload code, otherwise accepted.
/// * Timeouts and nested throttle rejections are overloaded.
/// * Any other error has no status to inspect and is treated as overloaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusClassifier;

impl StatusClassifier {
    pub fn classify_error(err: &BoxError) -> Outcome {
        match err.downcast_ref::<Status>() {
            Some(status) if !status.code().is_overload() => Outcome::Accepted,
            // overload codes, timeouts, nested throttling and unknown errors
            _ => Outcome::Overloaded,
        }
    }
}

impl<Resp> Classify<Resp> for StatusClassifier {
    fn classify(&self, outcome: Result<&Resp, &BoxError>) -> Outcome {
        match outcome {
            Ok(_) => Outcome::Accepted,
            Err(err) => Self::classify_error(err),
        }
    }
}

/// Classifies with a closure. See [`classify_fn`].
#[derive(Debug, Clone, Copy)]
pub struct ClassifyFn<F> {
    f: F,
}

/// Returns a classifier that calls `f`.
pub fn classify_fn<F, Resp>(f: F) -> ClassifyFn<F>
where
    F: Fn(Result<&Resp, &BoxError>) -> Outcome,
{
    ClassifyFn { f }
}

impl<F, Resp> Classify<Resp> for ClassifyFn<F>
where
    F: Fn(Result<&Resp, &BoxError>) -> Outcome,
{
    fn classify(&self, outcome: Result<&Resp, &BoxError>) -> Outcome {
        (self.f)(outcome)
    }
}

/// Classifies `http` responses by status code.
///
/// `429`, `502`, `503` and `504` responses are overloaded, every other response is
/// accepted. Errors are classified by [`StatusClassifier`].
#[cfg(feature = "http")]
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpClassifier;

#[cfg(feature = "http")]
impl<B> Classify<http::Response<B>> for HttpClassifier {
    fn classify(&self, outcome: Result<&http::Response<B>, &BoxError>) -> Outcome {
        use http::StatusCode;

        match outcome {
            Ok(response) => match response.status() {
                StatusCode::TOO_MANY_REQUESTS
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT => Outcome::Overloaded,
                _ => Outcome::Accepted,
            },
            Err(err) => StatusClassifier::classify_error(err),
        }
    }
}

/// Runs `classifier`, treating a panic as [`Outcome::Overloaded`].
pub(crate) fn classify_or_overloaded<C, Resp>(
    classifier: &C,
    outcome: Result<&Resp, &BoxError>,
) -> Outcome
where
    C: Classify<Resp>,
{
    catch_unwind(AssertUnwindSafe(|| classifier.classify(outcome))).unwrap_or_else(|_| {
        tracing::warn!("outcome classifier panicked; counting the call as overloaded");
        Outcome::Overloaded
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ThrottleError;
    use crate::status::Code;

    fn err(e: impl Into<BoxError>) -> BoxError {
        e.into()
    }

    #[test]
    fn successes_are_accepted() {
        assert_eq!(
            StatusClassifier.classify(Ok::<_, &BoxError>(&())),
            Outcome::Accepted
        );
    }

    #[test]
    fn overload_codes_are_not_accepted() {
        for code in crate::status::OVERLOAD_CODES {
            let e = err(Status::new(code, "shed"));
            assert_eq!(
                StatusClassifier.classify(Err::<&(), _>(&e)),
                Outcome::Overloaded,
                "{code}"
            );
        }
    }

    #[test]
    fn application_errors_are_accepted() {
        for code in [
            Code::InvalidArgument,
            Code::NotFound,
            Code::PermissionDenied,
            Code::Internal,
            Code::Unknown,
        ] {
            let e = err(Status::new(code, "app error"));
            assert_eq!(
                StatusClassifier.classify(Err::<&(), _>(&e)),
                Outcome::Accepted,
                "{code}"
            );
        }
    }

    #[test]
    fn unclassifiable_errors_are_not_accepted() {
        let e = err("connection reset");
        assert_eq!(
            StatusClassifier.classify(Err::<&(), _>(&e)),
            Outcome::Overloaded
        );

        let e = err(ThrottleError::Throttled);
        assert_eq!(
            StatusClassifier.classify(Err::<&(), _>(&e)),
            Outcome::Overloaded
        );
    }

    #[test]
    fn timeouts_are_not_accepted() {
        let e = err(tower::timeout::error::Elapsed::new());
        assert_eq!(
            StatusClassifier.classify(Err::<&(), _>(&e)),
            Outcome::Overloaded
        );
    }

    #[test]
    fn closures_can_classify() {
        let by_value = classify_fn(|res: Result<&u16, &BoxError>| match res {
            Ok(v) if *v >= 500 => Outcome::Overloaded,
            Ok(_) => Outcome::Accepted,
            Err(_) => Outcome::Overloaded,
        });
        assert_eq!(by_value.classify(Ok(&200)), Outcome::Accepted);
        assert_eq!(by_value.classify(Ok(&503)), Outcome::Overloaded);
    }

    #[test]
    fn a_panicking_classifier_counts_as_overloaded() {
        let broken = classify_fn(|_: Result<&(), &BoxError>| -> Outcome { panic!("bug") });
        assert_eq!(classify_or_overloaded(&broken, Ok(&())), Outcome::Overloaded);
    }

    #[cfg(feature = "http")]
    #[test]
    fn http_statuses_are_classified() {
        let response = |code: u16| {
            http::Response::builder()
                .status(code)
                .body(())
                .unwrap()
        };
        for code in [200, 201, 400, 404, 500] {
            assert_eq!(
                HttpClassifier.classify(Ok(&response(code))),
                Outcome::Accepted,
                "{code}"
            );
        }
        for code in [429, 502, 503, 504] {
            assert_eq!(
                HttpClassifier.classify(Ok(&response(code))),
                Outcome::Overloaded,
                "{code}"
            );
        }
    }
}
