use std::sync::Arc;
use std::sync::Barrier;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;

use athrottle::AdaptiveCounter;
use athrottle::CounterConfig;
use athrottle::Throttle;

// A full intercepted call: decide, then mark request and (every other call) accept
fn intercept<T: Throttle + ?Sized>(throttle: &T, i: u64) {
    if !throttle.reject_next() {
        throttle.mark_request();
        if i % 2 == 0 {
            throttle.mark_accept();
        }
    }
}

fn bench_single_counter(group_name: &str, c: &mut Criterion, counter: Arc<AdaptiveCounter>) {
    let mut group = c.benchmark_group(group_name);

    group.bench_function("reject_next", |b| {
        b.iter(|| black_box(counter.as_ref()).reject_next())
    });

    group.bench_function("intercept", |b| {
        let mut i = 0;
        b.iter(|| {
            intercept(black_box(counter.as_ref()), i);
            i += 1;
        })
    });

    group.finish();
}

fn bench_parallel_counter(group_name: &str, c: &mut Criterion, counter: Arc<AdaptiveCounter>) {
    let mut group = c.benchmark_group(group_name);

    for threads in [2, 4, 8].iter() {
        let num_threads = *threads;
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}-threads", num_threads)),
            &num_threads,
            |b, &n| {
                b.iter_custom(|iters| {
                    let barrier = Arc::new(Barrier::new(n + 1));
                    let mut handles = Vec::with_capacity(n);

                    for _ in 0..n {
                        let counter = Arc::clone(&counter);
                        let bar = Arc::clone(&barrier);
                        let iters_per_thread = iters / n as u64;

                        handles.push(thread::spawn(move || {
                            bar.wait(); // Wait for the start signal
                            for i in 0..iters_per_thread {
                                intercept(black_box(counter.as_ref()), i);
                            }
                        }));
                    }

                    // Synchronize the start across all threads
                    barrier.wait();
                    let start = Instant::now();

                    for handle in handles {
                        let _ = handle.join();
                    }

                    start.elapsed()
                });
            },
        );
    }
    group.finish();
}

fn bench_dynamic_counter(group_name: &str, c: &mut Criterion, throttle: Arc<dyn Throttle>) {
    let mut group = c.benchmark_group(format!("Dynamic-{}", group_name));

    group.bench_function("intercept", |b| {
        let mut i = 0;
        b.iter(|| {
            intercept(black_box(throttle.as_ref()), i);
            i += 1;
        })
    });

    group.finish();
}

fn run_all_benches(c: &mut Criterion) {
    let bin_duration = Duration::from_secs(10);

    // The ring is summed on every decision, so compare a small and a large window
    for bins in [6, 18, 360] {
        let config = CounterConfig::new(bins, bin_duration)
            .with_min_request_threshold(25)
            .with_seed(1);
        let counter = Arc::new(AdaptiveCounter::new(config).unwrap());
        let name = format!("AdaptiveCounter-{bins}-bins");

        bench_single_counter(&name, c, Arc::clone(&counter));
        bench_parallel_counter(&name, c, counter.clone());
        bench_dynamic_counter(&name, c, counter);
    }
}

criterion_group!(benches, run_all_benches);
criterion_main!(benches);
