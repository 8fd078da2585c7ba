/// US company filings from the [SEC]; tickers, submissions, XBRL company facts & filing documents.
///
/// [SEC]: https://www.sec.gov/search-filings/edgar-application-programming-interfaces
pub mod sec;

/// Statements, news sentiment & intraday prices from the [Alpha Vantage] query API.
///
/// [Alpha Vantage]: https://www.alphavantage.co/documentation/
pub mod alpha_vantage;
