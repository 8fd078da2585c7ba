use crate::FetchError;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

const MAX_CIK: u64 = 9_999_999_999;
const MAX_TICKER_LEN: usize = 64;

/// The key for every fetch: either a ticker symbol or an SEC Central Index Key.
///
/// Parsing decides which: anything that is all digits (optionally prefixed with `CIK`) is a
/// [`Cik`], anything else must be a valid ticker.
///
/// ```rust
/// use fincrawl_spider::{Cik, Identifier};
///
/// let aapl: Identifier = "aapl".parse().unwrap();
/// assert_eq!(aapl, Identifier::Ticker("AAPL".to_string()));
///
/// let cik: Identifier = "CIK320193".parse().unwrap();
/// assert_eq!(cik, Identifier::Cik(Cik::new(320193).unwrap()));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Identifier {
    Ticker(String),
    Cik(Cik),
}

impl Identifier {
    /// Validate and upper-case a ticker symbol.
    ///
    /// Besides alphanumerics, `.` and `-` (share classes, e.g. `BRK.B`), `:` (e.g.
    /// `CRYPTO:BTC`) and `,` (ticker lists for news sentiment) are accepted, as long as at least
    /// one alphanumeric is present.
    pub fn ticker(symbol: &str) -> Result<Self, FetchError> {
        let symbol = symbol.trim();
        let valid = !symbol.is_empty()
            && symbol.len() <= MAX_TICKER_LEN
            && symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | ','))
            // the symbol names output folders; `.` or `..` alone would escape them
            && symbol.chars().any(|c| c.is_ascii_alphanumeric());
        if !valid {
            return Err(FetchError::InvalidIdentifier(symbol.to_string()));
        }
        Ok(Self::Ticker(symbol.to_ascii_uppercase()))
    }

    /// File-system safe rendering, used for payload keys and output folders.
    pub fn clean(&self) -> String {
        self.to_string().replace([',', ':'], "_")
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ticker(ticker) => f.write_str(ticker),
            Self::Cik(cik) => write!(f, "CIK{}", cik.padded()),
        }
    }
}

impl FromStr for Identifier {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = strip_cik_prefix(trimmed);
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Self::Cik(digits.parse()?));
        }
        Self::ticker(trimmed)
    }
}

impl From<Cik> for Identifier {
    fn from(cik: Cik) -> Self {
        Self::Cik(cik)
    }
}

/// SEC Central Index Key; at most 10 digits, zero-padded to 10 on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cik(u64);

impl Cik {
    pub fn new(value: u64) -> Result<Self, FetchError> {
        if value > MAX_CIK {
            return Err(FetchError::InvalidIdentifier(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// ```rust
    /// use fincrawl_spider::Cik;
    /// assert_eq!(Cik::new(320193).unwrap().padded(), "0000320193");
    /// ```
    pub fn padded(&self) -> String {
        format!("{:010}", self.0)
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Cik {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = strip_cik_prefix(s.trim());
        if digits.is_empty() || digits.len() > 10 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(FetchError::InvalidIdentifier(s.to_string()));
        }
        let value = digits
            .parse::<u64>()
            .map_err(|_| FetchError::InvalidIdentifier(s.to_string()))?;
        Self::new(value)
    }
}

fn strip_cik_prefix(s: &str) -> &str {
    match s.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("cik") => &s[3..],
        _ => s,
    }
}

// The SEC is inconsistent: `company_tickers.json` serves the CIK as a number, the
// submissions index as a zero-padded string.
struct CikVisitor;

impl<'de> Visitor<'de> for CikVisitor {
    type Value = Cik;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a CIK, as an integer or a string of digits")
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Cik::new(value).map_err(E::custom)
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let value = u64::try_from(value).map_err(E::custom)?;
        self.visit_u64(value)
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        value.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Cik {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(CikVisitor)
    }
}

//////////////////////////////////////////////////////////////
// -- TESTS --
//////////////////////////////////////////////////////////////

#[test]
fn cik_padding() {
    assert_eq!(Cik::new(1).unwrap().padded(), "0000000001");
    assert_eq!("0000320193".parse::<Cik>().unwrap().value(), 320193);
    assert_eq!("cik1321655".parse::<Cik>().unwrap().padded(), "0001321655");
    assert!("12345678901".parse::<Cik>().is_err());
    assert!("".parse::<Cik>().is_err());
}

#[test]
fn identifier_parsing() {
    assert_eq!(
        "brk.b".parse::<Identifier>().unwrap(),
        Identifier::Ticker("BRK.B".to_string())
    );
    assert!(matches!(
        "320193".parse::<Identifier>().unwrap(),
        Identifier::Cik(_)
    ));
    assert!(matches!(
        "AAPL; DROP".parse::<Identifier>(),
        Err(FetchError::InvalidIdentifier(_))
    ));
    assert!("".parse::<Identifier>().is_err());
    for punctuation in [".", "..", "-.-", ",:"] {
        assert!(
            Identifier::ticker(punctuation).is_err(),
            "{punctuation:?} accepted"
        );
    }
    assert_eq!(
        Identifier::ticker("CRYPTO:BTC,PLTR").unwrap().clean(),
        "CRYPTO_BTC_PLTR"
    );
}

#[test]
fn cik_deserializes_from_number_or_string() {
    let from_number: Cik = serde_json::from_str("320193").unwrap();
    let from_string: Cik = serde_json::from_str("\"0000320193\"").unwrap();
    assert_eq!(from_number, from_string);
}
