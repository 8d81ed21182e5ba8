//! Micro benchmarks for the per-client rate limiter.
//!
//! Measures the admission hot path: table lookup-or-insert plus one token
//! check, for a single hot client and for a large population of clients, and
//! one eviction pass over a full table.
//!
//! ## Run
//! ```bash
//! cargo bench --bench bench_rate_limit
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tollgate_lib::security::rate_limit::{BucketParams, ClientLimiterTable, TokenBucket};

fn params() -> BucketParams {
    BucketParams::new(1_000_000.0, 1_000_000)
}

fn bench_bucket_allow(c: &mut Criterion) {
    let bucket = TokenBucket::new(params());
    c.bench_function("token_bucket_allow", |b| {
        b.iter(|| std::hint::black_box(bucket.allow()));
    });
}

fn bench_table_hot_client(c: &mut Criterion) {
    let table = ClientLimiterTable::new(params());
    c.bench_function("table_get_or_create_allow_hot_client", |b| {
        b.iter(|| table.get_or_create(std::hint::black_box("203.0.113.7")).allow());
    });
}

fn bench_table_many_clients(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_get_or_create_allow_many_clients");
    for clients in [1_000usize, 100_000] {
        let table = ClientLimiterTable::new(params());
        let identities: Vec<String> = (0..clients).map(|i| format!("client-{i}")).collect();
        let mut next = 0usize;

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(clients), &identities, |b, ids| {
            b.iter(|| {
                next = (next + 1) % ids.len();
                table.get_or_create(&ids[next]).allow()
            });
        });
    }
    group.finish();
}

fn bench_evict_stale(c: &mut Criterion) {
    let start = Instant::now();
    c.bench_function("table_evict_stale_10k_half_idle", |b| {
        b.iter_batched(
            || {
                let table = Arc::new(ClientLimiterTable::new(params()));
                for i in 0..10_000u64 {
                    let seen = start + Duration::from_secs(i % 2 * 200);
                    table.get_or_create_at(&format!("client-{i}"), seen);
                }
                table
            },
            |table| {
                table.evict_stale_at(start + Duration::from_secs(300), Duration::from_secs(180))
            },
            criterion::BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    rate_limit_benches,
    bench_bucket_allow,
    bench_table_hot_client,
    bench_table_many_clients,
    bench_evict_stale
);
criterion_main!(rate_limit_benches);
