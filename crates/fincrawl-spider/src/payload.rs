use crate::{EndpointKind, FetchError, Identifier, Provider};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

/// Markup family of a payload body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Xml,
    Json,
}

/// What downstream parsing keys a payload by.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PayloadKey {
    pub identifier: Option<Identifier>,
    pub endpoint: EndpointKind,
}

/// The unmodified response body, with the provider's headers.
#[derive(Clone, Debug)]
pub struct Body {
    pub key: PayloadKey,
    /// Source URL, query string removed.
    pub source: String,
    pub headers: HeaderMap,
    pub text: String,
    pub fetched_at: DateTime<Utc>,
}

/// One provider response, tagged by provider & format so that parsers can dispatch without
/// sniffing the content.
#[derive(Clone, Debug)]
pub enum RawPayload {
    /// A filing document from the EDGAR archives (XBRL / XHTML markup).
    EdgarDocument(Body),

    /// JSON from `data.sec.gov` & `www.sec.gov/files`: tickers, submissions, company facts.
    EdgarJson(Body),

    /// JSON from the Alpha Vantage query API.
    AlphaVantage(Body),

    /// JSON from the FRED observations API.
    Fred(Body),
}

impl RawPayload {
    pub fn provider(&self) -> Provider {
        match self {
            Self::EdgarDocument(_) | Self::EdgarJson(_) => Provider::Sec,
            Self::AlphaVantage(_) => Provider::AlphaVantage,
            Self::Fred(_) => Provider::Fred,
        }
    }

    pub fn format(&self) -> Format {
        match self {
            Self::EdgarDocument(_) => Format::Xml,
            _ => Format::Json,
        }
    }

    pub fn body(&self) -> &Body {
        match self {
            Self::EdgarDocument(body)
            | Self::EdgarJson(body)
            | Self::AlphaVantage(body)
            | Self::Fred(body) => body,
        }
    }

    pub fn into_body(self) -> Body {
        match self {
            Self::EdgarDocument(body)
            | Self::EdgarJson(body)
            | Self::AlphaVantage(body)
            | Self::Fred(body) => body,
        }
    }

    pub fn key(&self) -> &PayloadKey {
        &self.body().key
    }

    pub fn text(&self) -> &str {
        &self.body().text
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.body().headers
    }

    /// Deserialize a JSON payload. Calling this on markup is a [`FetchError::MalformedData`].
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        if self.format() != Format::Json {
            return Err(FetchError::malformed(
                self.provider(),
                format!("{} is not a JSON payload", self.key().endpoint),
            ));
        }
        serde_json::from_str(self.text())
            .map_err(|err| FetchError::malformed(self.provider(), err))
    }
}

//////////////////////////////////////////////////////////////
// -- TESTS --
//////////////////////////////////////////////////////////////

#[cfg(test)]
fn body(text: &str, endpoint: EndpointKind) -> Body {
    Body {
        key: PayloadKey {
            identifier: Some(Identifier::ticker("PLTR").unwrap()),
            endpoint,
        },
        source: "https://example.com".to_string(),
        headers: HeaderMap::new(),
        text: text.to_string(),
        fetched_at: Utc::now(),
    }
}

#[test]
fn tags_dispatch_provider_and_format() {
    let document = RawPayload::EdgarDocument(body("<xbrl/>", EndpointKind::Filing));
    assert_eq!(document.provider(), Provider::Sec);
    assert_eq!(document.format(), Format::Xml);
    assert!(matches!(
        document.json::<serde_json::Value>(),
        Err(FetchError::MalformedData { .. })
    ));

    let series = RawPayload::AlphaVantage(body("{\"a\": 1}", EndpointKind::Earnings));
    assert_eq!(series.provider(), Provider::AlphaVantage);
    assert_eq!(series.json::<serde_json::Value>().unwrap()["a"], 1);

    let broken = RawPayload::Fred(body("{", EndpointKind::FredSeries));
    assert!(matches!(
        broken.json::<serde_json::Value>(),
        Err(FetchError::MalformedData {
            provider: Provider::Fred,
            ..
        })
    ));
}
