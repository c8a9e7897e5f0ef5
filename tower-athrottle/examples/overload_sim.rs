use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use athrottle::CounterConfig;
use clap::Parser;
use tokio::time::Instant;
use tower::BoxError;
use tower::Layer;
use tower::Service;
use tower::ServiceExt;
use tower_athrottle::AdaptiveCounter;
use tower_athrottle::AdaptiveThrottleLayer;
use tower_athrottle::Code;
use tower_athrottle::EventMetrics;
use tower_athrottle::Status;
use tower_athrottle::ThrottleError;

/// Drives a backend through a healthy, an overloaded and a recovered phase and reports how
/// many calls the adaptive throttle shed in each.
#[derive(Parser, Debug)]
struct Args {
    /// Number of bins in the sliding window
    #[arg(long, default_value_t = 10)]
    bins: usize,

    /// Width of each bin
    #[arg(long, value_parser = humantime::parse_duration, default_value = "100ms")]
    bin_duration: Duration,

    /// Requests required in the window before throttling
    #[arg(long, default_value_t = 25)]
    min_requests: u64,

    /// Multiplier applied to accepts
    #[arg(long, default_value_t = 2.0)]
    ratio: f64,

    /// Length of each phase
    #[arg(long, value_parser = humantime::parse_duration, default_value = "2s")]
    phase: Duration,

    /// Delay between calls
    #[arg(long, value_parser = humantime::parse_duration, default_value = "1ms")]
    interval: Duration,

    #[arg(long, default_value_t = 1)]
    seed: u64,
}

#[derive(Default, Debug)]
struct PhaseReport {
    sent: usize,
    ok: usize,
    failed: usize,
    throttled: usize,
}

async fn run_phase<S>(svc: &mut S, length: Duration, interval: Duration) -> PhaseReport
where
    S: Service<(), Response = &'static str, Error = BoxError>,
{
    let mut report = PhaseReport::default();
    let deadline = Instant::now() + length;

    while Instant::now() < deadline {
        report.sent += 1;
        match svc.ready().await {
            Ok(ready) => match ready.call(()).await {
                Ok(_) => report.ok += 1,
                Err(e) => match e.downcast_ref::<ThrottleError>() {
                    Some(ThrottleError::Throttled) => report.throttled += 1,
                    _ => report.failed += 1,
                },
            },
            Err(e) => {
                tracing::error!(error = %e, "backend unavailable");
                report.failed += 1;
            }
        }
        tokio::time::sleep(interval).await;
    }
    report
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let metrics = EventMetrics::new();
    let config = CounterConfig::new(args.bins, args.bin_duration)
        .with_min_request_threshold(args.min_requests)
        .with_overload_ratio(args.ratio)
        .with_seed(args.seed)
        .with_shared_callback(metrics.callback());
    let counter = Arc::new(AdaptiveCounter::new(config)?);

    let overloaded = Arc::new(AtomicBool::new(false));
    let backend_state = overloaded.clone();
    let backend = tower::service_fn(move |_: ()| {
        let overloaded = backend_state.load(Ordering::SeqCst);
        async move {
            if overloaded {
                Err(BoxError::from(Status::new(Code::Unavailable, "backend overloaded")))
            } else {
                Ok("ok")
            }
        }
    });

    let mut svc = AdaptiveThrottleLayer::new(counter.clone()).layer(backend);

    println!("Window: {} bins x {:?}", args.bins, args.bin_duration);
    for (name, is_overloaded) in [("healthy", false), ("overloaded", true), ("recovered", false)] {
        overloaded.store(is_overloaded, Ordering::SeqCst);
        let report = run_phase(&mut svc, args.phase, args.interval).await;
        let shed = report.throttled as f64 / report.sent.max(1) as f64 * 100.0;
        println!(
            "{name:>10}: sent={} ok={} failed={} throttled={} ({shed:.1}% shed) window={:?}",
            report.sent,
            report.ok,
            report.failed,
            report.throttled,
            counter.totals()
        );
    }

    Ok(())
}
