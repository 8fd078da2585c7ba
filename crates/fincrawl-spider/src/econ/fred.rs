use crate::session::{check_status, into_body};
use crate::transport::HttpRequest;
use crate::{EndpointKind, FetchError, FetchRequest, Identifier, Provider, RawPayload, Session};
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, error, trace, warn};

const OBSERVATIONS_PATH: &str = "fred/series/observations";

/// Series collected when none are named: `(series_id, title)`.
pub const DEFAULT_SERIES: [(&str, &str); 2] = [
    ("DFF", "Federal Funds Effective Rate"),
    ("UNRATE", "Unemployment Rate"),
];

/// Fetch every observation of a FRED series, e.g. `UNRATE`.
pub async fn fetch_fred_series(session: &Session, series_id: &str) -> Result<RawPayload, FetchError> {
    let key = match session.config().fred_key() {
        Some(key) => key,
        None => {
            error!("failed to build FRED request, FRED_API_KEY is not set");
            return Err(FetchError::auth(Provider::Fred, "FRED_API_KEY is not set"));
        }
    };
    // series ids follow the same character rules as tickers
    let series = Identifier::ticker(series_id)?;

    let request = FetchRequest::new(Provider::Fred, Some(series.clone()), EndpointKind::FredSeries);
    let mut url = session
        .config()
        .endpoints
        .fred
        .join(OBSERVATIONS_PATH)
        .map_err(|err| FetchError::transport(Provider::Fred, err))?;
    url.query_pairs_mut()
        .append_pair("series_id", &series.to_string())
        .append_pair("api_key", key)
        .append_pair("file_type", "json");
    let http = HttpRequest::new(Provider::Fred, url);
    let source = http.redacted_url();

    trace!("fetching Fred data {series}");
    let response = session.send_unchecked(&request, http).await?;

    // FRED explains a bad series or key in the body of a 400
    if response.status == StatusCode::BAD_REQUEST {
        let message = serde_json::from_str::<FredError>(&response.body)
            .map(|err| err.error_message)
            .unwrap_or_else(|_| response.body.clone());
        if message.contains("api_key") {
            error!("FRED rejected the API key: {message}");
            return Err(FetchError::auth(Provider::Fred, message));
        }
        warn!("FRED has no series {series}: {message}");
        return Err(request.not_found());
    }

    let window = session.budget(Provider::Fred).policy().window;
    let response = check_status(&request, window, response)?;
    debug!("fetched FRED series {series}, {} bytes", response.body.len());

    Ok(RawPayload::Fred(into_body(&request, source, response)))
}

//////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Deserialize)]
struct FredError {
    error_message: String,
}

/// The observations of a FRED payload.
#[derive(Debug, Deserialize)]
pub struct Observations {
    #[serde(rename = "observations")]
    pub inner: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
pub struct Observation {
    #[serde(rename = "date")]
    pub dated: String,
    pub value: String,
}

impl Observation {
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.dated, "%Y-%m-%d").ok()
    }

    /// FRED marks missing values with `"."`.
    pub fn value(&self) -> Option<f64> {
        self.value.parse::<f64>().ok()
    }
}

//////////////////////////////////////////////////////////////
// -- TESTS --
//////////////////////////////////////////////////////////////

#[test]
fn observations_with_gaps() {
    let json = r#"{ "observations": [
        { "realtime_start": "2024-01-01", "date": "2023-11-01", "value": "3.7" },
        { "realtime_start": "2024-01-01", "date": "2023-12-01", "value": "." }
    ]}"#;
    let data: Observations = serde_json::from_str(json).unwrap();
    assert_eq!(data.inner.len(), 2);
    assert_eq!(data.inner[0].value(), Some(3.7));
    assert_eq!(data.inner[1].value(), None);
    assert_eq!(
        data.inner[1].date(),
        NaiveDate::from_ymd_opt(2023, 12, 1)
    );
}
