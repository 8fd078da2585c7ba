mod common;

use common::*;
use fincrawl_spider::stock::sec::{self, FilingType};
use fincrawl_spider::*;
use reqwest::header::USER_AGENT;

const TICKERS: &str = "/files/company_tickers.json";
const PLTR_SUBMISSIONS: &str = "/submissions/CIK0001321655.json";
const PLTR_10K: &str = "/Archives/edgar/data/1321655/000132165524000022/pltr-20231231.htm";
const NOTK_SUBMISSIONS: &str = "/submissions/CIK0001923840.json";

fn edgar() -> std::sync::Arc<FakeTransport> {
    let transport = FakeTransport::new();
    transport.route(TICKERS, 200, &fixture("company_tickers.json"));
    transport.route(PLTR_SUBMISSIONS, 200, &fixture("submissions_pltr.json"));
    transport.route(PLTR_10K, 200, &fixture("pltr-20231231.htm"));
    transport.route(NOTK_SUBMISSIONS, 200, &fixture("submissions_no_10k.json"));
    transport.route(
        "/api/xbrl/companyfacts/CIK0001321655.json",
        200,
        &fixture("companyfacts_pltr.json"),
    );
    transport
}

fn ten_k() -> FilingType {
    FilingType::Form("10-K".to_string())
}

#[tokio::test]
async fn fetch_filing_by_ticker() {
    let transport = edgar();
    let session = session(config(), &transport);
    let pltr = Identifier::ticker("pltr").unwrap();

    let payload = sec::fetch_filing(&session, &pltr, &ten_k()).await.unwrap();

    assert!(matches!(payload, RawPayload::EdgarDocument(_)));
    assert_eq!(payload.format(), Format::Xml);
    assert_eq!(payload.key().identifier, Some(pltr));
    assert_eq!(payload.key().endpoint, EndpointKind::Filing);
    assert!(payload.text().contains("us-gaap:Revenues"));

    // ticker map, submissions index, document; each carrying the contact email
    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|call| {
        call.headers.get(USER_AGENT).map(|v| v.to_str().unwrap()) == Some("analyst@example.com")
    }));
    assert_eq!(transport.calls_to(PLTR_10K), 1);
}

#[tokio::test]
async fn fetch_filing_by_cik_skips_ticker_lookup() {
    let transport = edgar();
    let session = session(config(), &transport);
    let cik: Identifier = "0001321655".parse().unwrap();

    sec::fetch_filing(&session, &cik, &ten_k()).await.unwrap();

    assert_eq!(transport.calls_to(TICKERS), 0);
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn xbrl_selector_takes_newest_xbrl_filing() {
    let transport = edgar();
    let session = session(config(), &transport);
    let pltr = Identifier::ticker("PLTR").unwrap();

    // the newest filing, a form 4, has no XBRL; the 10-K after it does
    sec::fetch_filing(&session, &pltr, &FilingType::Xbrl)
        .await
        .unwrap();
    assert_eq!(transport.calls_to(PLTR_10K), 1);

    let filings = sec::list_filings(&session, &pltr, &FilingType::Xbrl, 20)
        .await
        .unwrap();
    let forms: Vec<&str> = filings.iter().map(|f| f.form.as_str()).collect();
    assert_eq!(forms, ["10-K", "8-K"]);
}

#[tokio::test]
async fn cik_without_10k_is_not_found() {
    let transport = edgar();
    let session = session(config(), &transport);
    let notk = Identifier::ticker("NOTK").unwrap();

    let result = sec::fetch_filing(&session, &notk, &ten_k()).await;

    assert!(matches!(
        result,
        Err(FetchError::NotFound {
            provider: Provider::Sec,
            ..
        })
    ));
    // no archive document was requested
    assert!(transport
        .calls()
        .iter()
        .all(|call| !call.url.path().starts_with("/Archives")));
}

#[tokio::test]
async fn unknown_identifiers_are_not_found() {
    let transport = edgar();
    let session = session(config(), &transport);

    for identifier in ["ZZZZ", "CIK0000000042"] {
        let identifier: Identifier = identifier.parse().unwrap();
        let result = sec::fetch_filing(&session, &identifier, &ten_k()).await;
        assert!(
            matches!(result, Err(FetchError::NotFound { .. })),
            "{identifier}: {result:?}"
        );
    }
}

#[tokio::test]
async fn missing_contact_email_fails_before_any_request() {
    let transport = edgar();
    let config = Config {
        email: None,
        ..config()
    };
    let session = session(config, &transport);
    let pltr = Identifier::ticker("PLTR").unwrap();

    let result = sec::fetch_filing(&session, &pltr, &ten_k()).await;

    assert!(matches!(
        result,
        Err(FetchError::Auth {
            provider: Provider::Sec,
            ..
        })
    ));
    assert!(transport.calls().is_empty());
    assert_eq!(
        session.budget(Provider::Sec).status().await,
        BudgetStatus::Available { remaining: 10 }
    );
}

#[tokio::test]
async fn forbidden_is_auth() {
    let transport = FakeTransport::new();
    transport.route(PLTR_SUBMISSIONS, 403, "Undeclared Automated Tool");
    let session = session(config(), &transport);

    let result = sec::fetch_submissions(&session, &"1321655".parse().unwrap()).await;
    assert!(matches!(result, Err(FetchError::Auth { .. })));
}

#[tokio::test]
async fn ticker_map_is_fetched_once_per_session() {
    let transport = edgar();
    let session = session(config(), &transport);
    let pltr = Identifier::ticker("PLTR").unwrap();

    let facts = sec::fetch_company_facts(&session, &pltr).await.unwrap();
    sec::fetch_filing(&session, &pltr, &ten_k()).await.unwrap();

    assert_eq!(transport.calls_to(TICKERS), 1);
    assert!(matches!(facts, RawPayload::EdgarJson(_)));
    let json: serde_json::Value = facts.json().unwrap();
    assert_eq!(json["entityName"], "Palantir Technologies Inc.");
}

#[tokio::test]
async fn resolve_cik_from_ticker() {
    let transport = edgar();
    let session = session(config(), &transport);

    let cik = sec::resolve_cik(&session, &Identifier::ticker("BRK-B").unwrap())
        .await
        .unwrap();
    assert_eq!(cik.padded(), "0001067983");
}
