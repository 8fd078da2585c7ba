mod common;

use chrono::{NaiveDate, NaiveTime, Timelike};
use common::*;
use fincrawl_spider::stock::alpha_vantage::{self, *};
use fincrawl_spider::*;

const QUERY: &str = "/query";

fn aapl() -> Identifier {
    Identifier::ticker("AAPL").unwrap()
}

#[tokio::test]
async fn missing_api_key_never_reaches_the_network() {
    let transport = FakeTransport::new();
    transport.route(QUERY, 200, &fixture("income_statement_pltr.json"));
    let config = Config {
        alpha_vantage_api_key: None,
        ..config()
    };
    let session = session(config, &transport);

    let kinds = [
        SeriesKind::IncomeStatement,
        SeriesKind::NewsSentiment(NewsQuery::default()),
        SeriesKind::Intraday(IntradayQuery::default()),
    ];
    for kind in &kinds {
        let result = fetch_market_series(&session, &aapl(), kind, Interval::Min5).await;
        assert!(matches!(
            result,
            Err(FetchError::Auth {
                provider: Provider::AlphaVantage,
                ..
            })
        ));
    }

    assert!(transport.calls().is_empty());
    assert_eq!(
        session.budget(Provider::AlphaVantage).status().await,
        BudgetStatus::Available { remaining: 5 }
    );
}

#[tokio::test]
async fn blank_api_key_never_reaches_the_network() {
    let transport = FakeTransport::new();
    transport.route(QUERY, 200, &fixture("income_statement_pltr.json"));
    let config = Config {
        alpha_vantage_api_key: Some("   ".to_string()),
        ..config()
    };
    let session = session(config, &transport);

    let result =
        fetch_market_series(&session, &aapl(), &SeriesKind::IncomeStatement, Interval::Min5).await;
    assert!(matches!(result, Err(FetchError::Auth { .. })), "{result:?}");
    assert!(transport.calls().is_empty());
    assert_eq!(
        session.budget(Provider::AlphaVantage).status().await,
        BudgetStatus::Available { remaining: 5 }
    );
}

#[tokio::test]
async fn demo_key_refusal_is_auth() {
    let transport = FakeTransport::new();
    transport.route(
        QUERY,
        200,
        r#"{ "Information": "The **demo** API key is for demo purposes only. Please claim your free API key at (https://www.alphavantage.co/support/#api-key) to explore our full API offerings. It takes fewer than 20 seconds." }"#,
    );
    let session = session(config(), &transport);

    let result = fetch_market_series(&session, &aapl(), &SeriesKind::CashFlow, Interval::Min5).await;
    assert!(matches!(result, Err(FetchError::Auth { .. })), "{result:?}");
}

#[tokio::test]
async fn rejected_api_key_is_auth() {
    let transport = FakeTransport::new();
    transport.route(
        QUERY,
        200,
        r#"{ "Error Message": "the parameter apikey is invalid or missing. Please claim your free API key on (https://www.alphavantage.co/support/#api-key)." }"#,
    );
    let session = session(config(), &transport);

    let result =
        fetch_market_series(&session, &aapl(), &SeriesKind::BalanceSheet, Interval::Min5).await;
    assert!(matches!(result, Err(FetchError::Auth { .. })));
}

#[tokio::test]
async fn intraday_5min_bars_sit_on_5_minute_boundaries() {
    let transport = FakeTransport::new();
    transport.route_query(
        QUERY,
        ("function", "TIME_SERIES_INTRADAY"),
        200,
        &fixture("intraday_aapl_5min.json"),
    );
    let session = session(config(), &transport);

    let payload = fetch_market_series(
        &session,
        &aapl(),
        &SeriesKind::Intraday(IntradayQuery::default()),
        Interval::Min5,
    )
    .await
    .unwrap();

    assert!(matches!(payload, RawPayload::AlphaVantage(_)));
    assert_eq!(payload.key().endpoint, EndpointKind::Intraday);

    let open = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
    let close = NaiveTime::from_hms_opt(16, 0, 0).unwrap();
    let timestamps = alpha_vantage::intraday_timestamps(&payload).unwrap();
    assert_eq!(timestamps.len(), 6);
    assert!(timestamps.windows(2).all(|pair| pair[0] < pair[1]));
    for stamp in timestamps {
        assert_eq!(stamp.minute() % 5, 0, "{stamp}");
        assert_eq!(stamp.second(), 0, "{stamp}");
        assert!(stamp.time() >= open && stamp.time() <= close, "{stamp}");
        assert_eq!(stamp.date(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    // the request carried the interval & key
    let call = &transport.calls()[0];
    let query: Vec<(String, String)> = call.url.query_pairs().into_owned().collect();
    assert!(query.contains(&("symbol".to_string(), "AAPL".to_string())));
    assert!(query.contains(&("interval".to_string(), "5min".to_string())));
    assert!(query.contains(&("apikey".to_string(), "demo".to_string())));
    assert!(!call.redacted_url().contains("demo"));
}

#[tokio::test]
async fn statements_and_news_succeed() {
    let transport = FakeTransport::new();
    transport.route_query(
        QUERY,
        ("function", "INCOME_STATEMENT"),
        200,
        &fixture("income_statement_pltr.json"),
    );
    transport.route_query(
        QUERY,
        ("function", "NEWS_SENTIMENT"),
        200,
        &fixture("news_sentiment_pltr.json"),
    );
    let session = session(config(), &transport);
    let pltr = Identifier::ticker("PLTR").unwrap();

    let income = fetch_market_series(&session, &pltr, &SeriesKind::IncomeStatement, Interval::Min5)
        .await
        .unwrap();
    let json: serde_json::Value = income.json().unwrap();
    assert_eq!(json["symbol"], "PLTR");

    let news = SeriesKind::NewsSentiment(NewsQuery {
        topics: Some("technology".to_string()),
        limit: Some(1000),
        ..NewsQuery::default()
    });
    let payload = fetch_market_series(&session, &pltr, &news, Interval::Min5)
        .await
        .unwrap();
    assert_eq!(payload.key().endpoint, EndpointKind::NewsSentiment);

    let call = &transport.calls()[1];
    let query: Vec<(String, String)> = call.url.query_pairs().into_owned().collect();
    assert!(query.contains(&("tickers".to_string(), "PLTR".to_string())));
    assert!(query.contains(&("topics".to_string(), "technology".to_string())));
}

#[tokio::test]
async fn empty_news_is_not_found() {
    let transport = FakeTransport::new();
    transport.route(QUERY, 200, r#"{ "items": "0", "feed": [] }"#);
    let session = session(config(), &transport);

    let result = fetch_market_series(
        &session,
        &aapl(),
        &SeriesKind::NewsSentiment(NewsQuery::default()),
        Interval::Min5,
    )
    .await;
    assert!(matches!(result, Err(FetchError::NotFound { .. })));
}

#[tokio::test]
async fn cik_is_not_a_market_symbol() {
    let transport = FakeTransport::new();
    let session = session(config(), &transport);
    let cik: Identifier = "320193".parse().unwrap();

    let result = fetch_market_series(&session, &cik, &SeriesKind::Earnings, Interval::Min5).await;
    assert!(matches!(result, Err(FetchError::InvalidIdentifier(_))));
    assert!(transport.calls().is_empty());
}
