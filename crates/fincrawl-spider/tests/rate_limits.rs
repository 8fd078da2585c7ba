mod common;

use common::*;
use fincrawl_spider::stock::alpha_vantage::{fetch_market_series, Interval, SeriesKind};
use fincrawl_spider::*;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::time::Instant;

const QUERY: &str = "/query";

fn two_per_minute(mode: RateLimitMode) -> Config {
    Config {
        alpha_vantage_rate: RatePolicy::per_minute(NonZeroU32::new(2).unwrap()),
        rate_limit_mode: mode,
        ..config()
    }
}

async fn earnings(session: &Session) -> Result<RawPayload, FetchError> {
    let ibm = Identifier::ticker("IBM").unwrap();
    fetch_market_series(session, &ibm, &SeriesKind::Earnings, Interval::Min5).await
}

#[tokio::test(start_paused = true)]
async fn fail_fast_rejects_the_call_over_budget() {
    let transport = FakeTransport::new();
    transport.route(QUERY, 200, r#"{ "symbol": "IBM", "annualEarnings": [] }"#);
    let session = session(two_per_minute(RateLimitMode::FailFast), &transport);

    earnings(&session).await.unwrap();
    earnings(&session).await.unwrap();
    let third = earnings(&session).await;

    match third {
        Err(FetchError::RateLimit {
            provider,
            retry_after,
        }) => {
            assert_eq!(provider, Provider::AlphaVantage);
            assert!(retry_after <= Duration::from_secs(60));
        }
        other => panic!("expected RateLimit, got {other:?}"),
    }
    // the rejected call never reached the transport
    assert_eq!(transport.calls().len(), 2);

    tokio::time::advance(Duration::from_secs(60)).await;
    earnings(&session).await.unwrap();
    assert_eq!(transport.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn block_waits_out_the_window() {
    let transport = FakeTransport::new();
    transport.route(QUERY, 200, r#"{ "symbol": "IBM", "annualEarnings": [] }"#);
    let session = session(two_per_minute(RateLimitMode::Block), &transport);

    let start = Instant::now();
    for _ in 0..3 {
        earnings(&session).await.unwrap();
    }
    assert!(start.elapsed() >= Duration::from_secs(60));
    assert_eq!(transport.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn budgets_are_per_provider() {
    let transport = FakeTransport::new();
    transport.route(QUERY, 200, r#"{ "symbol": "IBM", "annualEarnings": [] }"#);
    transport.route(
        "/fred/series/observations",
        200,
        &fixture("fred_unrate.json"),
    );
    let session = session(two_per_minute(RateLimitMode::FailFast), &transport);

    earnings(&session).await.unwrap();
    earnings(&session).await.unwrap();
    assert!(earnings(&session).await.is_err());

    // an exhausted Alpha Vantage budget leaves FRED untouched
    fincrawl_spider::econ::fred::fetch_fred_series(&session, "UNRATE")
        .await
        .unwrap();
    assert!(matches!(
        session.budget(Provider::AlphaVantage).status().await,
        BudgetStatus::Exhausted { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_share_one_budget() {
    let transport = FakeTransport::new();
    transport.route(QUERY, 200, r#"{ "symbol": "IBM", "annualEarnings": [] }"#);
    let session = session(two_per_minute(RateLimitMode::FailFast), &transport);

    let results = futures::future::join_all((0..6).map(|_| earnings(&session))).await;
    let ok = results.iter().filter(|result| result.is_ok()).count();
    let limited = results
        .iter()
        .filter(|result| matches!(result, Err(FetchError::RateLimit { .. })))
        .count();

    assert_eq!(ok, 2);
    assert_eq!(limited, 4);
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn provider_throttling_is_rate_limit() {
    let transport = FakeTransport::new();
    transport.route("/submissions/CIK0000320193.json", 429, "");
    let session = session(config(), &transport);

    let result =
        fincrawl_spider::stock::sec::fetch_submissions(&session, &"320193".parse().unwrap()).await;
    assert!(matches!(
        result,
        Err(FetchError::RateLimit {
            provider: Provider::Sec,
            ..
        })
    ));
}

#[tokio::test]
async fn alpha_vantage_throttle_notes_are_rate_limit() {
    // both notes also point at the premium plans
    let notes = [
        r#"{ "Information": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day. Please subscribe to any of the premium plans at https://www.alphavantage.co/premium/ to instantly remove all daily rate limits." }"#,
        r#"{ "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute and 500 calls per day. Please visit https://www.alphavantage.co/premium/ if you would like to target a higher API call frequency." }"#,
    ];

    for note in notes {
        let transport = FakeTransport::new();
        transport.route(QUERY, 200, note);
        let session = session(config(), &transport);

        let result = earnings(&session).await;
        assert!(
            matches!(
                result,
                Err(FetchError::RateLimit {
                    provider: Provider::AlphaVantage,
                    ..
                })
            ),
            "{result:?}"
        );
    }
}

#[tokio::test]
async fn retry_after_header_is_honoured() {
    let mut headers = HeaderMap::new();
    headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
    let transport = FakeTransport::new();
    transport.respond(
        "/submissions/CIK0000320193.json",
        HttpResponse {
            status: reqwest::StatusCode::TOO_MANY_REQUESTS,
            headers,
            body: String::new(),
        },
    );
    let session = session(config(), &transport);

    let result =
        fincrawl_spider::stock::sec::fetch_submissions(&session, &"320193".parse().unwrap()).await;
    match result {
        Err(FetchError::RateLimit { retry_after, .. }) => {
            assert_eq!(retry_after, Duration::from_secs(7))
        }
        other => panic!("expected RateLimit, got {other:?}"),
    }
}
