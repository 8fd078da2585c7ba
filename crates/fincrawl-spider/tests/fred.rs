mod common;

use common::*;
use fincrawl_spider::econ::fred::{self, Observations};
use fincrawl_spider::*;

const OBSERVATIONS: &str = "/fred/series/observations";

#[tokio::test]
async fn fetch_unemployment_rate() {
    let transport = FakeTransport::new();
    transport.route_query(
        OBSERVATIONS,
        ("series_id", "UNRATE"),
        200,
        &fixture("fred_unrate.json"),
    );
    let session = session(config(), &transport);

    let payload = fred::fetch_fred_series(&session, "unrate").await.unwrap();

    assert!(matches!(payload, RawPayload::Fred(_)));
    assert_eq!(payload.provider(), Provider::Fred);
    assert_eq!(payload.key().endpoint, EndpointKind::FredSeries);
    let data: Observations = payload.json().unwrap();
    assert_eq!(data.inner.len(), 3);
    assert_eq!(data.inner[2].value(), Some(3.7));

    let call = &transport.calls()[0];
    assert!(call
        .url
        .query_pairs()
        .any(|(k, v)| k == "file_type" && v == "json"));
    assert!(!payload.body().source.contains("api_key"));
}

#[tokio::test]
async fn unknown_series_is_not_found() {
    let transport = FakeTransport::new();
    transport.route(
        OBSERVATIONS,
        400,
        r#"{ "error_code": 400, "error_message": "Bad Request.  The series does not exist." }"#,
    );
    let session = session(config(), &transport);

    let result = fred::fetch_fred_series(&session, "NOPE").await;
    assert!(matches!(
        result,
        Err(FetchError::NotFound {
            provider: Provider::Fred,
            ..
        })
    ));
}

#[tokio::test]
async fn rejected_key_is_auth() {
    let transport = FakeTransport::new();
    transport.route(
        OBSERVATIONS,
        400,
        r#"{ "error_code": 400, "error_message": "Bad Request.  The value for variable api_key is not registered." }"#,
    );
    let session = session(config(), &transport);

    let result = fred::fetch_fred_series(&session, "DFF").await;
    assert!(matches!(result, Err(FetchError::Auth { .. })));
}

#[tokio::test]
async fn missing_key_fails_without_a_request() {
    let transport = FakeTransport::new();
    let config = Config {
        fred_api_key: None,
        ..config()
    };
    let session = session(config, &transport);

    for (series, _) in fred::DEFAULT_SERIES {
        let result = fred::fetch_fred_series(&session, series).await;
        assert!(matches!(
            result,
            Err(FetchError::Auth {
                provider: Provider::Fred,
                ..
            })
        ));
    }
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn blank_key_fails_without_a_request() {
    let transport = FakeTransport::new();
    transport.route(OBSERVATIONS, 200, &fixture("fred_unrate.json"));
    let config = Config {
        fred_api_key: Some(" ".to_string()),
        ..config()
    };
    let session = session(config, &transport);

    let result = fred::fetch_fred_series(&session, "UNRATE").await;
    assert!(matches!(result, Err(FetchError::Auth { .. })));
    assert!(transport.calls().is_empty());
}
