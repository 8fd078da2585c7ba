use crate::{EndpointKind, RawPayload};
use std::path::{Path, PathBuf};
use tracing::{debug, error, trace};

/// Where a payload is saved under `root`:
/// `{root}/{ID}/{ID}_{GROUP}/{ID}_{ENDPOINT}[_{suffix}].{ext}`.
///
/// Statements share one `FINANCIAL_STATEMENTS` folder; filing documents keep their EDGAR file
/// name.
///
/// ```rust
/// # use fincrawl_spider::*;
/// # use std::path::Path;
/// # fn payload(endpoint: EndpointKind) -> RawPayload {
/// #     RawPayload::AlphaVantage(Body {
/// #         key: PayloadKey { identifier: Some(Identifier::ticker("PLTR").unwrap()), endpoint },
/// #         source: String::new(),
/// #         headers: Default::default(),
/// #         text: String::new(),
/// #         fetched_at: chrono::Utc::now(),
/// #     })
/// # }
/// let path = fs::payload_path(Path::new("data"), &payload(EndpointKind::CashFlow), None);
/// assert_eq!(path, Path::new("data/PLTR/PLTR_FINANCIAL_STATEMENTS/PLTR_CASH_FLOW.json"));
/// ```
pub fn payload_path(root: &Path, payload: &RawPayload, suffix: Option<&str>) -> PathBuf {
    let key = payload.key();
    let id = match &key.identifier {
        Some(identifier) => identifier.clean(),
        None => "SEC".to_string(),
    };
    let group = match key.endpoint {
        EndpointKind::IncomeStatement
        | EndpointKind::BalanceSheet
        | EndpointKind::CashFlow
        | EndpointKind::Earnings => "FINANCIAL_STATEMENTS",
        endpoint => endpoint.as_str(),
    };
    let folder = root.join(&id).join(format!("{id}_{group}"));

    let file = match key.endpoint {
        EndpointKind::Filing => payload
            .body()
            .source
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .map(|name| name.to_string())
            .unwrap_or_else(|| format!("{id}_{}.htm", key.endpoint)),
        _ => match suffix {
            Some(suffix) => format!("{id}_{}_{suffix}.json", key.endpoint),
            None => format!("{id}_{}.json", key.endpoint),
        },
    };

    folder.join(file)
}

/// Write the payload body, verbatim, to [`payload_path`]; creates directories as necessary.
pub async fn save_payload(
    root: &Path,
    payload: &RawPayload,
    suffix: Option<&str>,
) -> anyhow::Result<PathBuf> {
    let path = payload_path(root, payload, suffix);

    // ensure the directory exists
    if let Some(dir) = path.parent() {
        trace!("checking directory path: {:?}", dir);
        tokio::fs::create_dir_all(dir).await.map_err(|err| {
            error!("failed to create directory {}, error({err})", dir.display());
            err
        })?;
    }

    tokio::fs::write(&path, payload.text()).await.map_err(|err| {
        error!("failed to write {}, error({err})", path.display());
        err
    })?;
    debug!("{} saved to {}", payload.key().endpoint, path.display());

    Ok(path)
}

/// Reads a `.json` file from `path`.
pub async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    trace!("reading file path: {}", path.display());
    let file = tokio::fs::read(path).await?;
    trace!("file read; deserializing bytes ...");
    let data: T = serde_json::from_slice(&file)?;
    Ok(data)
}

//////////////////////////////////////////////////////////////
// -- TESTS --
//////////////////////////////////////////////////////////////

#[cfg(test)]
fn payload(endpoint: EndpointKind, source: &str, text: &str) -> RawPayload {
    use crate::{Body, Identifier, PayloadKey};

    let body = Body {
        key: PayloadKey {
            identifier: Some(Identifier::ticker("BRK.B").unwrap()),
            endpoint,
        },
        source: source.to_string(),
        headers: Default::default(),
        text: text.to_string(),
        fetched_at: chrono::Utc::now(),
    };
    match endpoint {
        EndpointKind::Filing => RawPayload::EdgarDocument(body),
        _ => RawPayload::AlphaVantage(body),
    }
}

#[test]
fn layout_per_endpoint() {
    let root = Path::new("out");

    let intraday = payload(EndpointKind::Intraday, "", "{}");
    assert_eq!(
        payload_path(root, &intraday, Some("2023-01")),
        Path::new("out/BRK.B/BRK.B_TIME_SERIES_INTRADAY/BRK.B_TIME_SERIES_INTRADAY_2023-01.json")
    );

    let filing = payload(
        EndpointKind::Filing,
        "https://www.sec.gov/Archives/edgar/data/1067983/000095017024019809/brka-20231231.htm",
        "<html/>",
    );
    assert_eq!(
        payload_path(root, &filing, None),
        Path::new("out/BRK.B/BRK.B_EDGAR_FILING/brka-20231231.htm")
    );
}

#[tokio::test]
async fn saved_payload_reads_back_verbatim() {
    let root = std::env::temp_dir().join(format!("fincrawl-fs-{}", std::process::id()));
    let earnings = payload(
        EndpointKind::Earnings,
        "",
        r#"{"symbol": "BRK.B", "annualEarnings": []}"#,
    );

    let path = save_payload(&root, &earnings, None).await.unwrap();
    assert!(path.ends_with("BRK.B_FINANCIAL_STATEMENTS/BRK.B_EARNINGS.json"));

    let json: serde_json::Value = read_json(&path).await.unwrap();
    assert_eq!(json["symbol"], "BRK.B");

    tokio::fs::remove_dir_all(&root).await.unwrap();
}
