use super::{contact_headers, sec_url, tickers::resolve_cik};
use crate::{Cik, EndpointKind, FetchError, FetchRequest, Identifier, Provider, RawPayload, Session};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error};

/// Fetch the submissions index (`data.sec.gov/submissions/CIK##########.json`): company
/// metadata plus the recent filing history.
pub async fn fetch_submissions(
    session: &Session,
    identifier: &Identifier,
) -> Result<RawPayload, FetchError> {
    let headers = contact_headers(session)?;
    let cik = resolve_cik(session, identifier).await?;
    let request = FetchRequest::new(
        Provider::Sec,
        Some(identifier.clone()),
        EndpointKind::Submissions,
    );
    let http = sec_url(
        &session.config().endpoints.sec_data,
        &format!("submissions/CIK{}.json", cik.padded()),
        headers,
    )?;

    let body = session.fetch_body(&request, http).await?;
    Ok(RawPayload::EdgarJson(body))
}

/// The company's recent filings matching `filing_type`, newest first, at most `limit` of them.
pub async fn list_filings(
    session: &Session,
    identifier: &Identifier,
    filing_type: &FilingType,
    limit: usize,
) -> Result<Vec<Filing>, FetchError> {
    let submissions: Submissions = fetch_submissions(session, identifier).await?.json()?;
    let filings: Vec<Filing> = submissions
        .recent()?
        .into_iter()
        .filter(|filing| filing_type.matches(filing))
        .take(limit)
        .collect();

    debug!(
        "[{identifier}] {}: {} {filing_type} filings listed",
        submissions.name,
        filings.len()
    );
    Ok(filings)
}

/// Which filings to select from a company's history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilingType {
    /// A form type, matched exactly: `10-K` does not match `10-K/A`.
    Form(String),

    /// Any filing with an XBRL attachment.
    Xbrl,
}

impl FilingType {
    pub fn matches(&self, filing: &Filing) -> bool {
        match self {
            Self::Form(form) => filing.form.eq_ignore_ascii_case(form),
            Self::Xbrl => filing.is_xbrl,
        }
    }
}

impl FromStr for FilingType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("xbrl") {
            Ok(Self::Xbrl)
        } else {
            Ok(Self::Form(s.to_ascii_uppercase()))
        }
    }
}

impl fmt::Display for FilingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Form(form) => f.write_str(form),
            Self::Xbrl => f.write_str("XBRL"),
        }
    }
}

/// One row of a company's filing history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filing {
    pub accession_number: String,
    pub filing_date: NaiveDate,
    pub report_date: Option<NaiveDate>,
    pub form: String,
    pub primary_document: String,
    pub is_xbrl: bool,
    pub is_inline_xbrl: bool,
}

impl Filing {
    /// Archive path of the primary document: `Archives/edgar/data/{cik}/{accession}/{doc}`.
    pub fn archive_path(&self, cik: Cik) -> String {
        format!(
            "Archives/edgar/data/{cik}/{}/{}",
            self.accession_number.replace('-', ""),
            self.primary_document
        )
    }
}

// de
// ----------------------------------------------------------------------------

/// The parts of the submissions index the fetch layer reads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submissions {
    pub cik: Cik,
    pub name: String,
    #[serde(default)]
    pub tickers: Vec<String>,
    #[serde(default)]
    pub sic_description: Option<String>,
    filings: FilingHistory,
}

#[derive(Debug, Deserialize)]
struct FilingHistory {
    recent: RecentColumns,
}

// `recent` is columnar: one array per field, all the same length
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentColumns {
    accession_number: Vec<String>,
    filing_date: Vec<String>,
    #[serde(default)]
    report_date: Vec<String>,
    form: Vec<String>,
    primary_document: Vec<String>,
    #[serde(default, rename = "isXBRL")]
    is_xbrl: Vec<u8>,
    #[serde(default, rename = "isInlineXBRL")]
    is_inline_xbrl: Vec<u8>,
}

impl Submissions {
    /// The recent filings as rows, in the order the SEC lists them (newest first).
    pub fn recent(&self) -> Result<Vec<Filing>, FetchError> {
        let columns = &self.filings.recent;
        let len = columns.accession_number.len();
        if [
            columns.filing_date.len(),
            columns.form.len(),
            columns.primary_document.len(),
        ]
        .iter()
        .any(|n| *n != len)
        {
            error!("failed to parse submissions for CIK {}, ragged columns", self.cik);
            return Err(FetchError::malformed(
                Provider::Sec,
                format!("submissions for CIK {} have ragged columns", self.cik),
            ));
        }

        (0..len)
            .map(|i| {
                let filing_date = NaiveDate::parse_from_str(&columns.filing_date[i], "%Y-%m-%d")
                    .map_err(|err| {
                        FetchError::malformed(
                            Provider::Sec,
                            format!("filing date {:?}: {err}", columns.filing_date[i]),
                        )
                    })?;
                let report_date = columns
                    .report_date
                    .get(i)
                    .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok());

                Ok(Filing {
                    accession_number: columns.accession_number[i].clone(),
                    filing_date,
                    report_date,
                    form: columns.form[i].clone(),
                    primary_document: columns.primary_document[i].clone(),
                    is_xbrl: columns.is_xbrl.get(i).is_some_and(|flag| *flag == 1),
                    is_inline_xbrl: columns.is_inline_xbrl.get(i).is_some_and(|flag| *flag == 1),
                })
            })
            .collect()
    }
}

//////////////////////////////////////////////////////////////
// -- TESTS --
//////////////////////////////////////////////////////////////

#[test]
fn columns_become_rows() {
    let json = r#"{
        "cik": "1321655",
        "name": "Palantir Technologies Inc.",
        "tickers": ["PLTR"],
        "sicDescription": "Services-Prepackaged Software",
        "filings": { "recent": {
            "accessionNumber": ["0001321655-24-000022", "0001321655-24-000011"],
            "filingDate": ["2024-02-20", "2024-02-05"],
            "reportDate": ["2023-12-31", ""],
            "form": ["10-K", "8-K"],
            "primaryDocument": ["pltr-20231231.htm", "pltr-8k.htm"],
            "isXBRL": [1, 0],
            "isInlineXBRL": [1, 0]
        }}
    }"#;
    let submissions: Submissions = serde_json::from_str(json).unwrap();
    let filings = submissions.recent().unwrap();

    assert_eq!(filings.len(), 2);
    assert_eq!(filings[0].form, "10-K");
    assert!(filings[0].is_xbrl);
    assert_eq!(filings[1].report_date, None);
    assert!(FilingType::Form("10-K".to_string()).matches(&filings[0]));
    assert!(!FilingType::Xbrl.matches(&filings[1]));
    assert_eq!(
        filings[0].archive_path(submissions.cik),
        "Archives/edgar/data/1321655/000132165524000022/pltr-20231231.htm"
    );
}

#[test]
fn filing_type_parsing() {
    assert_eq!("10-k".parse::<FilingType>(), Ok(FilingType::Form("10-K".to_string())));
    assert_eq!("xbrl".parse::<FilingType>(), Ok(FilingType::Xbrl));
}
