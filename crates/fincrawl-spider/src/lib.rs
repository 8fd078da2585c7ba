//! The fincrawl fetch layer.
//!
//! Every fetch is made through a [`Session`], which owns the configuration, the HTTP transport
//! and one [`RateBudget`] per provider. A fetch spends one unit of its provider's budget per
//! request, and hands back the response body untouched, as a [`RawPayload`]; parsing it is left
//! to the caller.
//!
//! ```rust,no_run
//! use fincrawl_spider::stock::{alpha_vantage, sec};
//! use fincrawl_spider::{Config, Identifier, Session};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let session = Session::new(Config::from_env()?)?;
//! let pltr = Identifier::ticker("PLTR")?;
//!
//! let annual_report = sec::fetch_filing(&session, &pltr, &"10-K".parse()?).await?;
//! let bars = alpha_vantage::fetch_market_series(
//!     &session,
//!     &pltr,
//!     &alpha_vantage::SeriesKind::Intraday(Default::default()),
//!     alpha_vantage::Interval::Min5,
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod identifier;
mod payload;
mod rate_budget;
mod request;
mod session;
mod transport;

pub mod econ;
pub mod fs;
pub mod stock;

pub use config::{Config, Endpoints};
pub use error::{ConfigError, FetchError};
pub use identifier::{Cik, Identifier};
pub use payload::{Body, Format, PayloadKey, RawPayload};
pub use rate_budget::{BudgetStatus, RateBudget, RateLimitMode, RatePolicy};
pub use request::{intraday_months, EndpointKind, FetchRequest, Month, Provider, TimeRange};
pub use session::Session;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Transport};

/// Shortcut for required HTTP elements.
pub(crate) mod http {
    pub(crate) use reqwest::Client as HttpClient;
}

/// Readable elapsed time since `time`, for trailing log messages.
pub fn time_elapsed(time: std::time::Instant) -> String {
    format!("time elapsed: {:.3}s", time.elapsed().as_secs_f64())
}
