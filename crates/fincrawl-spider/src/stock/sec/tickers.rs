use super::{contact_headers, sec_url};
use crate::{Cik, EndpointKind, FetchError, FetchRequest, Identifier, Provider, RawPayload, Session};
use serde::de::{IgnoredAny, Visitor};
use serde::Deserialize;
use tracing::{debug, error, warn};

const TICKERS_PATH: &str = "files/company_tickers.json";

/// Fetch `company_tickers.json`, the SEC's map of every ticker to its CIK.
pub async fn fetch_tickers(session: &Session) -> Result<RawPayload, FetchError> {
    let headers = contact_headers(session)?;
    let request = FetchRequest::new(Provider::Sec, None, EndpointKind::CompanyTickers);
    let http = sec_url(&session.config().endpoints.sec_www, TICKERS_PATH, headers)?;

    debug!("fetching SEC Company Tickers");
    let body = session.fetch_body(&request, http).await?;
    Ok(RawPayload::EdgarJson(body))
}

/// The ticker map, deserialized; fetched once per session.
pub async fn tickers(session: &Session) -> Result<&Tickers, FetchError> {
    session
        .ticker_cache()
        .get_or_try_init(|| async move {
            let payload = fetch_tickers(session).await?;
            payload.json::<Tickers>().map_err(|err| {
                error!("failed to parse SEC Company Tickers, error({err})");
                err
            })
        })
        .await
}

/// The CIK behind an identifier; tickers are looked up in the SEC's ticker map.
pub async fn resolve_cik(session: &Session, identifier: &Identifier) -> Result<Cik, FetchError> {
    match identifier {
        Identifier::Cik(cik) => Ok(*cik),
        Identifier::Ticker(symbol) => match tickers(session).await?.find(symbol) {
            Some(ticker) => {
                debug!("resolved [{symbol}] {} to CIK {}", ticker.title, ticker.cik);
                Ok(ticker.cik)
            }
            None => {
                warn!("ticker [{symbol}] not found in SEC Company Tickers");
                Err(FetchError::not_found(
                    Provider::Sec,
                    format!("ticker {symbol}"),
                ))
            }
        },
    }
}

// de
// ----------------------------------------------------------------------------

/// Every company in `company_tickers.json`.
#[derive(Debug)]
pub struct Tickers(Vec<Ticker>);

#[derive(Clone, Debug, Deserialize)]
pub struct Ticker {
    #[serde(rename = "cik_str")]
    pub cik: Cik,
    pub ticker: String,
    pub title: String,
}

impl Tickers {
    /// Case-insensitive ticker lookup.
    pub fn find(&self, symbol: &str) -> Option<&Ticker> {
        self.0
            .iter()
            .find(|ticker| ticker.ticker.eq_ignore_ascii_case(symbol))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ticker> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

struct TickerVisitor;

impl<'de> Visitor<'de> for TickerVisitor {
    type Value = Tickers;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("Map of tickers")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        // each entry is in the form of:
        // `"0": { "cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc." },
        //  "1": { ... },
        //  ...`
        let mut tickers: Vec<Ticker> = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((_, ticker)) = map.next_entry::<IgnoredAny, Ticker>()? {
            tickers.push(ticker);
        }
        Ok(Tickers(tickers))
    }
}

impl<'de> Deserialize<'de> for Tickers {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // we want a vector returned, but the deserialize will expect a map, given
        // how the API has been designed
        deserializer.deserialize_map(TickerVisitor)
    }
}

//////////////////////////////////////////////////////////////
// -- TESTS --
//////////////////////////////////////////////////////////////

#[test]
fn ticker_map_deserializes_to_list() {
    let json = r#"{
        "0": { "cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc." },
        "1": { "cik_str": 1321655, "ticker": "PLTR", "title": "Palantir Technologies Inc." }
    }"#;
    let tickers: Tickers = serde_json::from_str(json).unwrap();
    assert_eq!(tickers.len(), 2);
    assert_eq!(tickers.find("pltr").unwrap().cik, Cik::new(1321655).unwrap());
    assert!(tickers.find("MSFT").is_none());
}
