use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use fincrawl_spider::stock::alpha_vantage::Interval;
use fincrawl_spider::stock::sec::FilingType;
use fincrawl_spider::{Identifier, Month};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Sets the level of tracing.
    ///
    /// Without it, progress bars are shown instead.
    #[arg(short, long, global = true)]
    pub trace: Option<TraceLevel>,

    /// Root folder for saved payloads; overrides FINCRAWL_OUTPUT_DIR.
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the latest filing(s) of a form type from the EDGAR archives.
    Filing {
        /// Ticker or CIK; defaults to TICKER.
        identifier: Option<Identifier>,

        /// Form type, e.g. `10-K`, `10-Q`, `8-K`; `xbrl` takes any filing with XBRL data.
        #[arg(short, long, default_value = "10-K")]
        form: FilingType,

        /// How many of the most recent matching filings to download.
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },

    /// Download the XBRL company facts.
    Facts {
        /// Ticker or CIK; defaults to TICKER.
        identifier: Option<Identifier>,
    },

    /// Download the submissions index (company metadata & filing history).
    Submissions {
        /// Ticker or CIK; defaults to TICKER.
        identifier: Option<Identifier>,
    },

    /// Download the SEC ticker to CIK map.
    Tickers,

    /// Download the income statement, balance sheet, cash flow & earnings.
    Statements {
        /// Ticker; defaults to TICKER.
        identifier: Option<Identifier>,
    },

    /// Download news sentiment.
    News {
        /// Ticker; defaults to TICKER.
        identifier: Option<Identifier>,

        /// Earliest article date, `YYYY-MM-DD`.
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Latest article date, `YYYY-MM-DD`.
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Comma separated topics, e.g. `technology,earnings`.
        #[arg(long, conflicts_with = "every_topic")]
        topics: Option<String>,

        /// One request per news topic, each saved separately.
        #[arg(long)]
        every_topic: bool,

        /// Maximum articles per request (up to 1000).
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Download intraday OHLCV bars.
    Intraday {
        /// Ticker; defaults to TICKER.
        identifier: Option<Identifier>,

        /// Bar width: 1min, 5min, 15min, 30min or 60min.
        #[arg(short, long, default_value = "5min")]
        interval: Interval,

        /// A whole year, fetched month by month.
        #[arg(short, long, conflicts_with = "month")]
        year: Option<i32>,

        /// One month, `YYYY-MM`.
        #[arg(short, long)]
        month: Option<Month>,
    },

    /// Download FRED series observations.
    Fred {
        /// Series ids; defaults to DFF & UNRATE.
        series: Vec<String>,
    },
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
#[clap(rename_all = "UPPERCASE")]
pub enum TraceLevel {
    DEBUG,
    ERROR,
    INFO,
    TRACE,
    WARN,
}

//////////////////////////////////////////////////////////////
// -- TESTS --
//////////////////////////////////////////////////////////////

#[test]
fn parse_intraday_year() {
    let cli = Cli::parse_from(["fincrawl", "intraday", "aapl", "--year", "2023", "-t", "DEBUG"]);
    assert_eq!(cli.trace, Some(TraceLevel::DEBUG));
    match cli.command {
        Commands::Intraday {
            identifier,
            interval,
            year,
            month,
        } => {
            assert_eq!(identifier, Some(Identifier::Ticker("AAPL".to_string())));
            assert_eq!(interval, Interval::Min5);
            assert_eq!(year, Some(2023));
            assert_eq!(month, None);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn parse_filing_by_cik() {
    let cli = Cli::parse_from(["fincrawl", "filing", "CIK0001321655", "--form", "xbrl", "-c", "20"]);
    match cli.command {
        Commands::Filing {
            identifier,
            form,
            count,
        } => {
            assert!(matches!(identifier, Some(Identifier::Cik(_))));
            assert_eq!(form, FilingType::Xbrl);
            assert_eq!(count, 20);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn year_and_month_conflict() {
    let parsed = Cli::try_parse_from([
        "fincrawl", "intraday", "--year", "2023", "--month", "2023-01",
    ]);
    assert!(parsed.is_err());
}
