use crate::transport::HttpRequest;
use crate::{Cik, EndpointKind, FetchError, FetchRequest, Identifier, Provider, RawPayload, Session};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Url;
use tracing::{debug, error, warn};

/// `company_tickers.json`; ticker to CIK resolution.
pub mod tickers;

/// The submissions index; company metadata & filing history.
pub mod submissions;

pub use submissions::{fetch_submissions, list_filings, Filing, FilingType, Submissions};
pub use tickers::{fetch_tickers, resolve_cik, tickers, Ticker, Tickers};

/// Fetch the most recent filing of `filing_type` for a company, as the raw document from the
/// EDGAR archives.
///
/// A company without a filing of that type is [`FetchError::NotFound`]; an empty success is
/// never returned.
pub async fn fetch_filing(
    session: &Session,
    identifier: &Identifier,
    filing_type: &FilingType,
) -> Result<RawPayload, FetchError> {
    // fail before any request if the SEC contact isn't configured
    contact_headers(session)?;

    let cik = resolve_cik(session, identifier).await?;
    let filing = match list_filings(session, identifier, filing_type, 1)
        .await?
        .into_iter()
        .next()
    {
        Some(filing) => filing,
        None => {
            warn!("[{identifier}] has no {filing_type} filing on record");
            return Err(FetchError::not_found(
                Provider::Sec,
                format!("{filing_type} filing for {identifier}"),
            ));
        }
    };

    fetch_filing_document(session, identifier, cik, &filing).await
}

/// Download one filing's primary document.
pub async fn fetch_filing_document(
    session: &Session,
    identifier: &Identifier,
    cik: Cik,
    filing: &Filing,
) -> Result<RawPayload, FetchError> {
    let headers = contact_headers(session)?;
    let request = FetchRequest::new(Provider::Sec, Some(identifier.clone()), EndpointKind::Filing);
    let http = sec_url(
        &session.config().endpoints.sec_www,
        &filing.archive_path(cik),
        headers,
    )?;

    debug!(
        "fetching {} {} filed {} for [{identifier}]",
        filing.form, filing.accession_number, filing.filing_date
    );
    let body = session.fetch_body(&request, http).await?;
    Ok(RawPayload::EdgarDocument(body))
}

/// Fetch the XBRL company facts (`data.sec.gov/api/xbrl/companyfacts/CIK##########.json`);
/// every reported metric, across the `dei`, `us-gaap`, `invest` & `srt` namespaces.
pub async fn fetch_company_facts(
    session: &Session,
    identifier: &Identifier,
) -> Result<RawPayload, FetchError> {
    let headers = contact_headers(session)?;
    let cik = resolve_cik(session, identifier).await?;
    let request = FetchRequest::new(
        Provider::Sec,
        Some(identifier.clone()),
        EndpointKind::CompanyFacts,
    );
    let http = sec_url(
        &session.config().endpoints.sec_data,
        &format!("api/xbrl/companyfacts/CIK{}.json", cik.padded()),
        headers,
    )?;

    let body = session.fetch_body(&request, http).await?;
    Ok(RawPayload::EdgarJson(body))
}

/// The SEC rejects requests without a contact address in the `User-Agent`.
pub(crate) fn contact_headers(session: &Session) -> Result<HeaderMap, FetchError> {
    let email = match session.config().email.as_deref() {
        Some(email) if email.contains('@') => email,
        Some(email) => {
            error!("EMAIL {email:?} is not an email address");
            return Err(FetchError::auth(
                Provider::Sec,
                "EMAIL is not an email address",
            ));
        }
        None => {
            error!("failed to build SEC request, EMAIL is not set");
            return Err(FetchError::auth(Provider::Sec, "EMAIL is not set"));
        }
    };

    let value = HeaderValue::from_str(email)
        .map_err(|err| FetchError::auth(Provider::Sec, format!("EMAIL is not a header value: {err}")))?;
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, value);
    Ok(headers)
}

pub(crate) fn sec_url(base: &Url, path: &str, headers: HeaderMap) -> Result<HttpRequest, FetchError> {
    let url = base
        .join(path)
        .map_err(|err| FetchError::transport(Provider::Sec, format!("bad URL {path}: {err}")))?;
    let mut request = HttpRequest::new(Provider::Sec, url);
    request.headers = headers;
    Ok(request)
}
