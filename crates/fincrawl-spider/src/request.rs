use crate::{FetchError, Identifier};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

/// The external data providers the fetch layer talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Provider {
    /// SEC EDGAR; the filings registry.
    Sec,

    /// Alpha Vantage; statements, news sentiment & intraday prices.
    AlphaVantage,

    /// St. Louis Fed economic data.
    Fred,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Sec, Provider::AlphaVantage, Provider::Fred];
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sec => "SEC EDGAR",
            Self::AlphaVantage => "Alpha Vantage",
            Self::Fred => "FRED",
        })
    }
}

/// What was asked of the provider; half of every payload's key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    CompanyTickers,
    Submissions,
    CompanyFacts,
    Filing,
    IncomeStatement,
    BalanceSheet,
    CashFlow,
    Earnings,
    NewsSentiment,
    Intraday,
    FredSeries,
}

impl EndpointKind {
    /// Upper snake case label; matches Alpha Vantage's `function` parameter where one exists.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompanyTickers => "COMPANY_TICKERS",
            Self::Submissions => "SUBMISSIONS",
            Self::CompanyFacts => "EDGAR_XBRL",
            Self::Filing => "EDGAR_FILING",
            Self::IncomeStatement => "INCOME_STATEMENT",
            Self::BalanceSheet => "BALANCE_SHEET",
            Self::CashFlow => "CASH_FLOW",
            Self::Earnings => "EARNINGS",
            Self::NewsSentiment => "NEWS_SENTIMENT",
            Self::Intraday => "TIME_SERIES_INTRADAY",
            Self::FredSeries => "FRED_SERIES",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An optional, possibly open-ended, window of time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

impl TimeRange {
    pub fn new(from: Option<NaiveDateTime>, to: Option<NaiveDateTime>) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt = |t: Option<NaiveDateTime>| match t {
            Some(t) => t.format("%Y%m%dT%H%M").to_string(),
            None => "open".to_string(),
        };
        write!(f, "{}_to_{}", fmt(self.from), fmt(self.to))
    }
}

/// A calendar month, `YYYY-MM`; the unit Alpha Vantage pages historic intraday data by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First instant of this month up to the first instant of the next.
    pub fn range(&self) -> TimeRange {
        let start = NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0));
        let end = self
            .next()
            .and_then(|m| NaiveDate::from_ymd_opt(m.year, m.month, 1))
            .and_then(|d| d.and_hms_opt(0, 0, 0));
        TimeRange::new(start, end)
    }

    fn next(&self) -> Option<Self> {
        match self.month {
            12 => Self::new(self.year + 1, 1),
            m => Self::new(self.year, m + 1),
        }
    }
}

/// The twelve months of `year`, in order.
///
/// ```rust
/// let months = fincrawl_spider::intraday_months(2023);
/// assert_eq!(months.len(), 12);
/// assert_eq!(months[0].to_string(), "2023-01");
/// assert_eq!(months[11].to_string(), "2023-12");
/// ```
pub fn intraday_months(year: i32) -> Vec<Month> {
    (1..=12).filter_map(|m| Month::new(year, m)).collect()
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")?;
        Ok(Self {
            year: date.year(),
            month: date.month(),
        })
    }
}

/// One call to one provider. Built per call; only lives as long as the call.
#[derive(Clone, Debug)]
pub struct FetchRequest {
    pub provider: Provider,
    pub identifier: Option<Identifier>,
    pub endpoint: EndpointKind,
    pub range: Option<TimeRange>,
}

impl FetchRequest {
    pub fn new(provider: Provider, identifier: Option<Identifier>, endpoint: EndpointKind) -> Self {
        Self {
            provider,
            identifier,
            endpoint,
            range: None,
        }
    }

    pub fn with_range(mut self, range: Option<TimeRange>) -> Self {
        self.range = range;
        self
    }

    pub(crate) fn subject(&self) -> String {
        match &self.identifier {
            Some(identifier) => identifier.to_string(),
            None => "*".to_string(),
        }
    }

    pub(crate) fn not_found(&self) -> FetchError {
        FetchError::not_found(self.provider, self)
    }
}

impl fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.subject(), self.endpoint)?;
        if let Some(range) = &self.range {
            write!(f, " ({range})")?;
        }
        Ok(())
    }
}

//////////////////////////////////////////////////////////////
// -- TESTS --
//////////////////////////////////////////////////////////////

#[test]
fn month_parsing_and_range() {
    let month: Month = "2023-12".parse().unwrap();
    assert_eq!(month, Month::new(2023, 12).unwrap());
    assert!("2023-13".parse::<Month>().is_err());

    let range = month.range();
    assert_eq!(range.from.unwrap().to_string(), "2023-12-01 00:00:00");
    assert_eq!(range.to.unwrap().to_string(), "2024-01-01 00:00:00");
    assert_eq!(range.to_string(), "20231201T0000_to_20240101T0000");
}

#[test]
fn request_display() {
    let request = FetchRequest::new(
        Provider::AlphaVantage,
        Some(Identifier::ticker("pltr").unwrap()),
        EndpointKind::Intraday,
    )
    .with_range(Some(Month::new(2023, 1).unwrap().range()));
    assert_eq!(
        request.to_string(),
        "[PLTR] TIME_SERIES_INTRADAY (20230101T0000_to_20230201T0000)"
    );
}
