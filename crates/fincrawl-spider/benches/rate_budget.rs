use chrono::Utc;
use criterion::*;
use fincrawl_spider::stock::alpha_vantage;
use fincrawl_spider::*;
use reqwest::header::HeaderMap;
use std::num::NonZeroU32;
use std::sync::Arc;

// acquire from a budget that never runs dry
// ----------------------------------------------------------
fn benchmark_acquire(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let policy = RatePolicy::per_second(NonZeroU32::MAX);
    let budget = Arc::new(RateBudget::new(Provider::Sec, policy, RateLimitMode::FailFast));

    c.bench_function("acquire", |b| {
        b.to_async(&runtime).iter(|| {
            let budget = budget.clone();
            async move { black_box(budget.acquire().await) }
        })
    });

    c.bench_function("acquire, 8 contending tasks", |b| {
        b.to_async(&runtime).iter(|| {
            let budget = budget.clone();
            async move {
                let tasks: Vec<_> = (0..8)
                    .map(|_| {
                        let budget = budget.clone();
                        tokio::spawn(async move { budget.acquire().await })
                    })
                    .collect();
                for task in tasks {
                    let _ = black_box(task.await);
                }
            }
        })
    });
}

// read the bar timestamps of an intraday payload
// ----------------------------------------------------------
fn benchmark_intraday_timestamps(c: &mut Criterion) {
    let path = format!(
        "{}/tests/files/intraday_aapl_5min.json",
        env!("CARGO_MANIFEST_DIR")
    );
    let text = std::fs::read_to_string(path).expect("Unable to read file");
    let payload = RawPayload::AlphaVantage(Body {
        key: PayloadKey {
            identifier: Identifier::ticker("AAPL").ok(),
            endpoint: EndpointKind::Intraday,
        },
        source: String::new(),
        headers: HeaderMap::new(),
        text,
        fetched_at: Utc::now(),
    });

    c.bench_function("intraday timestamps", |b| {
        b.iter(|| alpha_vantage::intraday_timestamps(black_box(&payload)))
    });
}

criterion_group!(benches, benchmark_acquire, benchmark_intraday_timestamps,);
criterion_main!(benches);
