use crate::transport::HttpRequest;
use crate::{
    EndpointKind, FetchError, FetchRequest, Identifier, Month, Provider, RawPayload, Session,
    TimeRange,
};
use chrono::NaiveDateTime;
use reqwest::Url;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, warn};

const QUERY_PATH: &str = "query";

/// Bar width for intraday series; Alpha Vantage serves nothing else.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interval {
    Min1,
    #[default]
    Min5,
    Min15,
    Min30,
    Min60,
}

impl Interval {
    pub fn minutes(&self) -> u32 {
        match self {
            Self::Min1 => 1,
            Self::Min5 => 5,
            Self::Min15 => 15,
            Self::Min30 => 30,
            Self::Min60 => 60,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Min1 => "1min",
            Self::Min5 => "5min",
            Self::Min15 => "15min",
            Self::Min30 => "30min",
            Self::Min60 => "60min",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_end_matches("min") {
            "1" => Ok(Self::Min1),
            "5" => Ok(Self::Min5),
            "15" => Ok(Self::Min15),
            "30" => Ok(Self::Min30),
            "60" => Ok(Self::Min60),
            _ => Err(format!(
                "unsupported interval `{s}`, expected one of 1min, 5min, 15min, 30min, 60min"
            )),
        }
    }
}

/// Parameters of a news sentiment query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewsQuery {
    pub range: Option<TimeRange>,
    /// e.g. `technology`, `earnings`; see [`NEWS_TOPICS`].
    pub topics: Option<String>,
    /// Alpha Vantage defaults to 50, and caps at 1000.
    pub limit: Option<u32>,
}

/// Every topic Alpha Vantage tags news with.
pub const NEWS_TOPICS: [&str; 15] = [
    "blockchain",
    "earnings",
    "ipo",
    "mergers_and_acquisitions",
    "financial_markets",
    "economy_fiscal",
    "economy_monetary",
    "economy_macro",
    "energy_transportation",
    "finance",
    "life_sciences",
    "manufacturing",
    "real_estate",
    "retail_wholesale",
    "technology",
];

/// Parameters of an intraday OHLCV query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntradayQuery {
    /// A historic month; `None` is the most recent trading days.
    pub month: Option<Month>,
    pub extended_hours: bool,
    pub adjusted: bool,
    /// `outputsize=full` rather than the latest 100 bars.
    pub full: bool,
}

impl Default for IntradayQuery {
    fn default() -> Self {
        Self {
            month: None,
            extended_hours: true,
            adjusted: false,
            full: true,
        }
    }
}

/// The series Alpha Vantage is asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SeriesKind {
    IncomeStatement,
    BalanceSheet,
    CashFlow,
    Earnings,
    NewsSentiment(NewsQuery),
    Intraday(IntradayQuery),
}

impl SeriesKind {
    /// The four financial statement series.
    pub fn statements() -> [SeriesKind; 4] {
        [
            Self::IncomeStatement,
            Self::BalanceSheet,
            Self::CashFlow,
            Self::Earnings,
        ]
    }

    pub fn endpoint(&self) -> EndpointKind {
        match self {
            Self::IncomeStatement => EndpointKind::IncomeStatement,
            Self::BalanceSheet => EndpointKind::BalanceSheet,
            Self::CashFlow => EndpointKind::CashFlow,
            Self::Earnings => EndpointKind::Earnings,
            Self::NewsSentiment(_) => EndpointKind::NewsSentiment,
            Self::Intraday(_) => EndpointKind::Intraday,
        }
    }

    fn range(&self) -> Option<TimeRange> {
        match self {
            Self::NewsSentiment(query) => query.range,
            Self::Intraday(query) => query.month.map(|month| month.range()),
            _ => None,
        }
    }
}

/// Fetch a statement, news sentiment or intraday series from Alpha Vantage.
///
/// `interval` only affects intraday series. A missing or blank API key fails with
/// [`FetchError::Auth`] before any budget is spent or request is made.
pub async fn fetch_market_series(
    session: &Session,
    identifier: &Identifier,
    kind: &SeriesKind,
    interval: Interval,
) -> Result<RawPayload, FetchError> {
    let api_key = match session.config().alpha_vantage_key() {
        Some(key) => key,
        None => {
            error!("failed to build Alpha Vantage request, ALPHA_VANTAGE_API_KEY is not set");
            return Err(FetchError::auth(
                Provider::AlphaVantage,
                "ALPHA_VANTAGE_API_KEY is not set",
            ));
        }
    };
    let symbol = match identifier {
        Identifier::Ticker(symbol) => symbol,
        Identifier::Cik(_) => {
            error!("Alpha Vantage needs a ticker, found {identifier}");
            return Err(FetchError::InvalidIdentifier(identifier.to_string()));
        }
    };

    let request = FetchRequest::new(
        Provider::AlphaVantage,
        Some(identifier.clone()),
        kind.endpoint(),
    )
    .with_range(kind.range());
    let http = query_url(
        &session.config().endpoints.alpha_vantage,
        &query_params(symbol, kind, interval, api_key),
    )?;

    let body = session.fetch_body(&request, http).await?;
    check_body(&request, session.budget(Provider::AlphaVantage).policy().window, &body.text)?;
    debug!("{request} fetched, {} bytes", body.text.len());

    Ok(RawPayload::AlphaVantage(body))
}

/// The bar timestamps of an intraday payload, oldest first.
pub fn intraday_timestamps(payload: &RawPayload) -> Result<Vec<NaiveDateTime>, FetchError> {
    let json: Map<String, Value> = payload.json()?;
    let series = json
        .iter()
        .find(|(key, _)| key.starts_with("Time Series"))
        .and_then(|(_, series)| series.as_object())
        .ok_or_else(|| FetchError::malformed(Provider::AlphaVantage, "no intraday time series"))?;

    let mut timestamps = series
        .keys()
        .map(|stamp| {
            NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S").map_err(|err| {
                FetchError::malformed(Provider::AlphaVantage, format!("timestamp {stamp:?}: {err}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    timestamps.sort();
    Ok(timestamps)
}

fn query_params(
    symbol: &str,
    kind: &SeriesKind,
    interval: Interval,
    api_key: &str,
) -> Vec<(&'static str, String)> {
    let mut params = vec![("function", kind.endpoint().as_str().to_string())];

    match kind {
        SeriesKind::NewsSentiment(query) => {
            params.push(("tickers", symbol.to_string()));
            if let Some(range) = &query.range {
                if let Some(from) = range.from {
                    params.push(("time_from", from.format("%Y%m%dT%H%M").to_string()));
                }
                if let Some(to) = range.to {
                    params.push(("time_to", to.format("%Y%m%dT%H%M").to_string()));
                }
            }
            if let Some(topics) = &query.topics {
                params.push(("topics", topics.clone()));
            }
            if let Some(limit) = query.limit {
                params.push(("limit", limit.to_string()));
            }
        }
        SeriesKind::Intraday(query) => {
            params.push(("symbol", symbol.to_string()));
            params.push(("interval", interval.to_string()));
            if let Some(month) = query.month {
                params.push(("month", month.to_string()));
            }
            params.push(("adjusted", query.adjusted.to_string()));
            params.push(("extended_hours", query.extended_hours.to_string()));
            let size = if query.full { "full" } else { "compact" };
            params.push(("outputsize", size.to_string()));
        }
        _ => params.push(("symbol", symbol.to_string())),
    }

    params.push(("apikey", api_key.to_string()));
    params
}

fn query_url(base: &Url, params: &[(&'static str, String)]) -> Result<HttpRequest, FetchError> {
    let mut url = base
        .join(QUERY_PATH)
        .map_err(|err| FetchError::transport(Provider::AlphaVantage, err))?;
    url.query_pairs_mut()
        .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
    Ok(HttpRequest::new(Provider::AlphaVantage, url))
}

// Alpha Vantage answers `200 OK` to almost everything; failures are described in the body.
fn check_body(
    request: &FetchRequest,
    window: std::time::Duration,
    text: &str,
) -> Result<(), FetchError> {
    let provider = Provider::AlphaVantage;
    let json: Value = serde_json::from_str(text).map_err(|err| {
        error!("failed to parse {request} as JSON, error({err})");
        FetchError::malformed(provider, err)
    })?;
    let Some(object) = json.as_object() else {
        return Err(FetchError::malformed(provider, "expected a JSON object"));
    };

    if let Some(msg) = message(object, "Error Message") {
        if mentions_api_key(msg) {
            error!("Alpha Vantage rejected the API key for {request}: {msg}");
            return Err(FetchError::auth(provider, msg));
        }
        warn!("Alpha Vantage has no data for {request}: {msg}");
        return Err(request.not_found());
    }

    if let Some(msg) = message(object, "Information").or_else(|| message(object, "Note")) {
        // throttle notes also advertise the premium plans, so they are matched first
        let lower = msg.to_ascii_lowercase();
        if lower.contains("rate limit") || lower.contains("call frequency") {
            warn!("Alpha Vantage throttled {request}: {msg}");
            return Err(FetchError::RateLimit {
                provider,
                retry_after: window,
            });
        }
        if mentions_api_key(msg) || lower.contains("premium") {
            error!("Alpha Vantage refused {request}: {msg}");
            return Err(FetchError::auth(provider, msg));
        }
        error!("failed to fetch {request}, Alpha Vantage says: {msg}");
        return Err(FetchError::transport(provider, msg));
    }

    let empty = object.is_empty()
        || object
            .get("items")
            .and_then(Value::as_str)
            .is_some_and(|items| items == "0");
    if empty {
        warn!("Alpha Vantage returned no records for {request}");
        return Err(request.not_found());
    }

    Ok(())
}

fn message<'a>(object: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    object.get(field).and_then(Value::as_str)
}

fn mentions_api_key(msg: &str) -> bool {
    let lower = msg.to_ascii_lowercase();
    lower.contains("apikey") || lower.contains("api key")
}

//////////////////////////////////////////////////////////////
// -- TESTS --
//////////////////////////////////////////////////////////////

#[cfg(test)]
const DAILY_LIMIT: &str = r#"{"Information": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day. Please subscribe to any of the premium plans at https://www.alphavantage.co/premium/ to instantly remove all daily rate limits."}"#;

#[cfg(test)]
const MINUTE_LIMIT: &str = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute and 500 calls per day. Please visit https://www.alphavantage.co/premium/ if you would like to target a higher API call frequency."}"#;

#[cfg(test)]
const DEMO_KEY: &str = r#"{"Information": "The **demo** API key is for demo purposes only. Please claim your free API key at (https://www.alphavantage.co/support/#api-key) to explore our full API offerings. It takes fewer than 20 seconds."}"#;

#[cfg(test)]
fn request(kind: &SeriesKind) -> FetchRequest {
    FetchRequest::new(
        Provider::AlphaVantage,
        Some(Identifier::ticker("AAPL").unwrap()),
        kind.endpoint(),
    )
}

#[test]
fn body_classification() {
    let window = std::time::Duration::from_secs(60);
    let income = request(&SeriesKind::IncomeStatement);

    assert!(matches!(
        check_body(&income, window, r#"{"Error Message": "Invalid API call. Please retry or visit the documentation."}"#),
        Err(FetchError::NotFound { .. })
    ));
    assert!(matches!(
        check_body(&income, window, r#"{"Information": "the parameter apikey is invalid or missing."}"#),
        Err(FetchError::Auth { .. })
    ));
    assert!(matches!(
        check_body(&income, window, DAILY_LIMIT),
        Err(FetchError::RateLimit { retry_after, .. }) if retry_after == window
    ));
    assert!(matches!(
        check_body(&income, window, MINUTE_LIMIT),
        Err(FetchError::RateLimit { .. })
    ));
    assert!(matches!(
        check_body(&income, window, DEMO_KEY),
        Err(FetchError::Auth { .. })
    ));
    assert!(matches!(
        check_body(&income, window, r#"{"Information": "This is a premium endpoint. You may subscribe to any of the premium plans at https://www.alphavantage.co/premium/ to instantly unlock all premium endpoints"}"#),
        Err(FetchError::Auth { .. })
    ));
    assert!(matches!(
        check_body(&income, window, "{}"),
        Err(FetchError::NotFound { .. })
    ));
    assert!(matches!(
        check_body(&income, window, "<html>"),
        Err(FetchError::MalformedData { .. })
    ));
    assert!(check_body(&income, window, r#"{"symbol": "AAPL", "annualReports": []}"#).is_ok());

    let news = request(&SeriesKind::NewsSentiment(NewsQuery::default()));
    assert!(matches!(
        check_body(&news, window, r#"{"items": "0", "feed": []}"#),
        Err(FetchError::NotFound { .. })
    ));
}

#[test]
fn intraday_query_params() {
    let kind = SeriesKind::Intraday(IntradayQuery {
        month: Some(Month::new(2023, 3).unwrap()),
        ..IntradayQuery::default()
    });
    let params = query_params("PLTR", &kind, Interval::Min15, "demo");
    let get = |k: &str| {
        params
            .iter()
            .find(|(key, _)| *key == k)
            .map(|(_, v)| v.as_str())
    };
    assert_eq!(get("function"), Some("TIME_SERIES_INTRADAY"));
    assert_eq!(get("interval"), Some("15min"));
    assert_eq!(get("month"), Some("2023-03"));
    assert_eq!(get("outputsize"), Some("full"));
    assert_eq!(get("apikey"), Some("demo"));
}

#[test]
fn interval_parsing() {
    assert_eq!("5min".parse::<Interval>(), Ok(Interval::Min5));
    assert_eq!("60".parse::<Interval>(), Ok(Interval::Min60));
    assert!("2min".parse::<Interval>().is_err());
    assert_eq!(Interval::default().minutes(), 5);
}
