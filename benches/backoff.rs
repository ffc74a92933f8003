//! Retry hot-path benchmark suite.
//!
//! Benchmarks the pure functions consulted on every failed attempt:
//! - Error classification across representative error shapes
//! - Backoff delay computation at growing attempt numbers
//! - A full in-memory retry sequence on a paused clock
//!
//! Run with: cargo bench --bench backoff
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::io::{Error as IoError, ErrorKind};
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tokio::runtime::Builder;

use devtools_reconnect::{Backoff, Error, FixedJitter, RetryPolicy, RetryingConnector, is_transient};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const ATTEMPTS: &[u32] = &[0, 5, 20, 64];

fn sample_errors() -> Vec<(&'static str, Error)> {
    vec![
        ("io_refused", Error::Io(IoError::from(ErrorKind::ConnectionRefused))),
        ("closed", Error::ConnectionClosed),
        ("message_transient", Error::remote("Protocol error (Page.navigate): Target closed.")),
        ("message_fatal", Error::remote("Invalid credentials supplied by caller")),
        ("config", Error::config("port out of range")),
    ]
}

// ============================================================================
// Benchmark: Classification
// ============================================================================

fn bench_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    for (name, error) in sample_errors() {
        group.bench_with_input(BenchmarkId::new("is_transient", name), &error, |b, error| {
            b.iter(|| is_transient(black_box(error)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Backoff
// ============================================================================

fn bench_backoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("backoff");
    let random = Backoff::default();
    let fixed = Backoff::default().with_jitter_source(FixedJitter::new(0.5));

    for &attempt in ATTEMPTS {
        group.bench_with_input(BenchmarkId::new("random", attempt), &attempt, |b, &attempt| {
            b.iter(|| random.delay_for_attempt(black_box(attempt)));
        });
        group.bench_with_input(BenchmarkId::new("fixed", attempt), &attempt, |b, &attempt| {
            b.iter(|| fixed.delay_for_attempt(black_box(attempt)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Retry Sequence
// ============================================================================

fn bench_retry_sequence(c: &mut Criterion) {
    let rt = Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("runtime");

    let connector = RetryingConnector::new(
        RetryPolicy::new(5)
            .with_base_delay(Duration::from_millis(1))
            .with_jitter_source(FixedJitter::none()),
    );

    c.bench_function("retry_sequence/4_failures", |b| {
        b.to_async(&rt).iter(|| async {
            let mut calls = 0u32;
            connector
                .connect("ws://127.0.0.1:9222/devtools/browser/bench", |_| {
                    calls += 1;
                    let n = calls;
                    async move {
                        if n < 5 {
                            Err(Error::ConnectionClosed)
                        } else {
                            Ok(n)
                        }
                    }
                })
                .await
        });
    });
}

criterion_group!(benches, bench_classification, bench_backoff, bench_retry_sequence);
criterion_main!(benches);
