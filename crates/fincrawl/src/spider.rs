use crate::cli::Commands;
use crate::tui::Progress;
use chrono::NaiveDate;
use fincrawl_spider::econ::fred;
use fincrawl_spider::stock::alpha_vantage::{
    fetch_market_series, IntradayQuery, Interval, NewsQuery, SeriesKind, NEWS_TOPICS,
};
use fincrawl_spider::stock::sec;
use fincrawl_spider::{
    fs, intraday_months, time_elapsed, FetchError, Identifier, RawPayload, Session, TimeRange,
};
use futures::future::{FutureExt, LocalBoxFuture};
use std::future::Future;
use tracing::{debug, error, info, warn};

/// One fetch to run and save.
struct Job<'a> {
    label: String,
    suffix: Option<String>,
    fetch: LocalBoxFuture<'a, Result<RawPayload, FetchError>>,
}

impl<'a> Job<'a> {
    fn new<F>(label: String, suffix: Option<String>, fetch: F) -> Self
    where
        F: Future<Output = Result<RawPayload, FetchError>> + 'a,
    {
        Self {
            label,
            suffix,
            fetch: fetch.boxed_local(),
        }
    }
}

/// Run a command: fetch every payload it names, one after another, and save each under the
/// configured output folder.
pub(crate) async fn run(session: &Session, command: Commands, tui: bool) -> anyhow::Result<()> {
    let time = std::time::Instant::now();

    let jobs = match command {
        Commands::Filing {
            identifier,
            form,
            count,
        } => {
            let id = identifier_or_default(session, identifier)?;
            filing_jobs(session, id, form, count).await?
        }

        Commands::Facts { identifier } => {
            let id = identifier_or_default(session, identifier)?;
            vec![Job::new(format!("[{id}] company facts"), None, async move {
                sec::fetch_company_facts(session, &id).await
            })]
        }

        Commands::Submissions { identifier } => {
            let id = identifier_or_default(session, identifier)?;
            vec![Job::new(format!("[{id}] submissions"), None, async move {
                sec::fetch_submissions(session, &id).await
            })]
        }

        Commands::Tickers => vec![Job::new(
            "SEC company tickers".to_string(),
            None,
            sec::fetch_tickers(session),
        )],

        Commands::Statements { identifier } => {
            let id = identifier_or_default(session, identifier)?;
            SeriesKind::statements()
                .into_iter()
                .map(|kind| market_job(session, &id, kind, Interval::default(), None))
                .collect()
        }

        Commands::News {
            identifier,
            from,
            to,
            topics,
            every_topic,
            limit,
        } => {
            let id = identifier_or_default(session, identifier)?;
            let range = news_range(from, to);
            match every_topic {
                true => NEWS_TOPICS
                    .iter()
                    .map(|topic| {
                        let query = NewsQuery {
                            range,
                            topics: Some(topic.to_string()),
                            limit,
                        };
                        let kind = SeriesKind::NewsSentiment(query);
                        market_job(session, &id, kind, Interval::default(), Some(topic.to_string()))
                    })
                    .collect(),
                false => {
                    let query = NewsQuery {
                        range,
                        topics,
                        limit,
                    };
                    let kind = SeriesKind::NewsSentiment(query);
                    vec![market_job(session, &id, kind, Interval::default(), None)]
                }
            }
        }

        Commands::Intraday {
            identifier,
            interval,
            year,
            month,
        } => {
            let id = identifier_or_default(session, identifier)?;
            let months = match (year, month) {
                (Some(year), _) => intraday_months(year),
                (None, Some(month)) => vec![month],
                (None, None) => vec![],
            };

            match months.is_empty() {
                true => {
                    let kind = SeriesKind::Intraday(IntradayQuery::default());
                    vec![market_job(session, &id, kind, interval, None)]
                }
                false => months
                    .into_iter()
                    .map(|month| {
                        let kind = SeriesKind::Intraday(IntradayQuery {
                            month: Some(month),
                            ..IntradayQuery::default()
                        });
                        market_job(session, &id, kind, interval, Some(month.to_string()))
                    })
                    .collect(),
            }
        }

        Commands::Fred { series } => {
            let series = match series.is_empty() {
                true => fred::DEFAULT_SERIES
                    .iter()
                    .map(|(id, _)| id.to_string())
                    .collect(),
                false => series,
            };
            series
                .into_iter()
                .map(|id| {
                    Job::new(format!("FRED {id}"), None, async move {
                        fred::fetch_fred_series(session, &id).await
                    })
                })
                .collect()
        }
    };

    fetch_and_save(session, jobs, tui).await?;
    info!("fincrawl finished, {}", time_elapsed(time));

    Ok(())
}

/// Run the jobs in order, saving each payload as it arrives. One failure doesn't stop the rest.
async fn fetch_and_save(session: &Session, jobs: Vec<Job<'_>>, tui: bool) -> anyhow::Result<()> {
    let root = session.config().output_dir.clone();
    let total = jobs.len();
    let progress = Progress::new(total, tui)?;
    let mut failed = 0;

    for job in jobs {
        let spinner = progress.spinner(job.label.clone());
        let outcome = match job.fetch.await {
            Ok(payload) => fs::save_payload(&root, &payload, job.suffix.as_deref()).await,
            Err(err) => Err(err.into()),
        };
        spinner.finish_and_clear();

        match outcome {
            Ok(path) => {
                debug!("{} saved to {}", job.label, path.display());
                progress.record(true);
            }
            Err(err) => {
                error!("failed to fetch {}, error({err})", job.label);
                failed += 1;
                progress.record(false);
            }
        }
    }
    progress.finish();

    match failed {
        0 => Ok(()),
        _ => {
            warn!("{failed} of {total} fetches failed");
            anyhow::bail!("{failed} of {total} fetches failed")
        }
    }
}

async fn filing_jobs<'a>(
    session: &'a Session,
    id: Identifier,
    form: sec::FilingType,
    count: usize,
) -> anyhow::Result<Vec<Job<'a>>> {
    if count <= 1 {
        let label = format!("[{id}] latest {form}");
        return Ok(vec![Job::new(label, None, async move {
            sec::fetch_filing(session, &id, &form).await
        })]);
    }

    let cik = sec::resolve_cik(session, &id).await?;
    let filings = sec::list_filings(session, &id, &form, count).await?;
    if filings.is_empty() {
        error!("[{id}] has no {form} filing on record");
        anyhow::bail!("no {form} filing for {id}");
    }

    Ok(filings
        .into_iter()
        .map(|filing| {
            let id = id.clone();
            let label = format!("[{id}] {} filed {}", filing.form, filing.filing_date);
            Job::new(label, None, async move {
                sec::fetch_filing_document(session, &id, cik, &filing).await
            })
        })
        .collect())
}

fn market_job<'a>(
    session: &'a Session,
    id: &Identifier,
    kind: SeriesKind,
    interval: Interval,
    suffix: Option<String>,
) -> Job<'a> {
    let id = id.clone();
    let label = match &suffix {
        Some(suffix) => format!("[{id}] {} {suffix}", kind.endpoint()),
        None => format!("[{id}] {}", kind.endpoint()),
    };
    Job::new(label, suffix, async move {
        fetch_market_series(session, &id, &kind, interval).await
    })
}

/// The identifier given on the command line, else `TICKER`.
fn identifier_or_default(
    session: &Session,
    identifier: Option<Identifier>,
) -> anyhow::Result<Identifier> {
    if let Some(identifier) = identifier {
        return Ok(identifier);
    }
    match &session.config().ticker {
        Some(ticker) => Ok(ticker.parse()?),
        None => {
            error!("no identifier given, and TICKER is not set");
            anyhow::bail!("no identifier given, and TICKER is not set")
        }
    }
}

// whole days: `from` at midnight, `to` through its last minute
fn news_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Option<TimeRange> {
    if from.is_none() && to.is_none() {
        return None;
    }
    Some(TimeRange::new(
        from.and_then(|date| date.and_hms_opt(0, 0, 0)),
        to.and_then(|date| date.and_hms_opt(23, 59, 0)),
    ))
}

//////////////////////////////////////////////////////////////
// -- TESTS --
//////////////////////////////////////////////////////////////

#[test]
fn news_range_covers_whole_days() {
    assert_eq!(news_range(None, None), None);

    let range = news_range(NaiveDate::from_ymd_opt(2024, 1, 2), NaiveDate::from_ymd_opt(2024, 1, 3))
        .unwrap();
    assert_eq!(range.to_string(), "20240102T0000_to_20240103T2359");
}
