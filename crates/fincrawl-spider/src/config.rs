use crate::error::ConfigError;
use crate::rate_budget::{RateLimitMode, RatePolicy};
use crate::Provider;
use reqwest::Url;
use std::num::{NonZeroU32, NonZeroU64};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

const SEC_CALLS_PER_SECOND: u32 = 10;
const ALPHA_VANTAGE_CALLS_PER_MINUTE: u32 = 5;
const FRED_CALLS_PER_MINUTE: u32 = 120;
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Base URLs of every provider.
#[derive(Clone, Debug)]
pub struct Endpoints {
    /// `data.sec.gov`: submissions & XBRL company facts.
    pub sec_data: Url,

    /// `www.sec.gov`: the ticker file & the filing archives.
    pub sec_www: Url,

    pub alpha_vantage: Url,

    pub fred: Url,
}

impl Default for Endpoints {
    fn default() -> Self {
        let parse = |url: &str| Url::parse(url).expect("valid base URL");
        Self {
            sec_data: parse("https://data.sec.gov/"),
            sec_www: parse("https://www.sec.gov/"),
            alpha_vantage: parse("https://www.alphavantage.co/"),
            fred: parse("https://api.stlouisfed.org/"),
        }
    }
}

impl Endpoints {
    /// Point every provider at one base URL.
    pub fn all_at(base: Url) -> Self {
        Self {
            sec_data: base.clone(),
            sec_www: base.clone(),
            alpha_vantage: base.clone(),
            fred: base,
        }
    }
}

/// Process configuration, read from the environment (and `.env`) at start-up.
///
/// Credentials are optional here; each fetch checks for the ones it needs and fails with
/// [`FetchError::Auth`](crate::FetchError::Auth) when they're missing.
#[derive(Clone, Debug)]
pub struct Config {
    /// `TICKER`: the default symbol for the CLI.
    pub ticker: Option<String>,

    /// `EMAIL`: contact address the SEC requires in the `User-Agent`.
    pub email: Option<String>,

    /// `ALPHA_VANTAGE_API_KEY`
    pub alpha_vantage_api_key: Option<String>,

    /// `FRED_API_KEY`
    pub fred_api_key: Option<String>,

    /// `SEC_RATE_LIMIT`, calls per second.
    pub sec_rate: RatePolicy,

    /// `ALPHA_VANTAGE_RATE_LIMIT`, calls per minute.
    pub alpha_vantage_rate: RatePolicy,

    /// `FRED_RATE_LIMIT`, calls per minute.
    pub fred_rate: RatePolicy,

    /// `RATE_LIMIT_MODE`: `block` or `fail-fast`.
    pub rate_limit_mode: RateLimitMode,

    /// `HTTP_TIMEOUT_SECS`
    pub timeout: Duration,

    /// `FINCRAWL_OUTPUT_DIR`: root for saved payloads.
    pub output_dir: PathBuf,

    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ticker: None,
            email: None,
            alpha_vantage_api_key: None,
            fred_api_key: None,
            sec_rate: RatePolicy::per_second(non_zero(SEC_CALLS_PER_SECOND)),
            alpha_vantage_rate: RatePolicy::per_minute(non_zero(ALPHA_VANTAGE_CALLS_PER_MINUTE)),
            fred_rate: RatePolicy::per_minute(non_zero(FRED_CALLS_PER_MINUTE)),
            rate_limit_mode: RateLimitMode::default(),
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            output_dir: PathBuf::from("."),
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    /// Load `.env` (if present) and read the configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_vars(|var| dotenv::var(var).ok())
    }

    /// Build a configuration from any variable lookup; blank values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self {
            ticker: get("TICKER"),
            email: get("EMAIL"),
            alpha_vantage_api_key: get("ALPHA_VANTAGE_API_KEY"),
            fred_api_key: get("FRED_API_KEY"),
            ..Self::default()
        };

        if let Some(value) = get("SEC_RATE_LIMIT") {
            config.sec_rate = RatePolicy::per_second(parse_calls("SEC_RATE_LIMIT", value)?);
        }
        if let Some(value) = get("ALPHA_VANTAGE_RATE_LIMIT") {
            config.alpha_vantage_rate =
                RatePolicy::per_minute(parse_calls("ALPHA_VANTAGE_RATE_LIMIT", value)?);
        }
        if let Some(value) = get("FRED_RATE_LIMIT") {
            config.fred_rate = RatePolicy::per_minute(parse_calls("FRED_RATE_LIMIT", value)?);
        }
        if let Some(value) = get("RATE_LIMIT_MODE") {
            config.rate_limit_mode = value.parse::<RateLimitMode>().map_err(|reason| ConfigError::Invalid {
                var: "RATE_LIMIT_MODE",
                value,
                reason,
            })?;
        }
        if let Some(value) = get("HTTP_TIMEOUT_SECS") {
            let secs = value.parse::<NonZeroU64>().map_err(|err| ConfigError::Invalid {
                var: "HTTP_TIMEOUT_SECS",
                value: value.clone(),
                reason: err.to_string(),
            })?;
            config.timeout = Duration::from_secs(secs.get());
        }
        if let Some(value) = get("FINCRAWL_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(value);
        }

        for (var, present) in [
            ("EMAIL", config.email.is_some()),
            ("ALPHA_VANTAGE_API_KEY", config.alpha_vantage_api_key.is_some()),
            ("FRED_API_KEY", config.fred_api_key.is_some()),
        ] {
            if present {
                debug!("{var} loaded");
            } else {
                warn!("{var} not set; requests needing it will fail");
            }
        }

        Ok(config)
    }

    /// `ALPHA_VANTAGE_API_KEY`, if set to something other than whitespace.
    pub fn alpha_vantage_key(&self) -> Option<&str> {
        credential(&self.alpha_vantage_api_key)
    }

    /// `FRED_API_KEY`, if set to something other than whitespace.
    pub fn fred_key(&self) -> Option<&str> {
        credential(&self.fred_api_key)
    }

    pub fn rate_policy(&self, provider: Provider) -> RatePolicy {
        match provider {
            Provider::Sec => self.sec_rate,
            Provider::AlphaVantage => self.alpha_vantage_rate,
            Provider::Fred => self.fred_rate,
        }
    }
}

fn parse_calls(var: &'static str, value: String) -> Result<NonZeroU32, ConfigError> {
    value.parse::<NonZeroU32>().map_err(|err| ConfigError::Invalid {
        var,
        value: value.clone(),
        reason: err.to_string(),
    })
}

// fields are public, so blank values can arrive without going through `from_vars`
fn credential(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

fn non_zero(calls: u32) -> NonZeroU32 {
    NonZeroU32::new(calls).unwrap_or(NonZeroU32::MIN)
}

//////////////////////////////////////////////////////////////
// -- TESTS --
//////////////////////////////////////////////////////////////

#[cfg(test)]
fn vars(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
    move |var: &str| {
        pairs
            .iter()
            .find(|(k, _)| *k == var)
            .map(|(_, v)| v.to_string())
    }
}

#[test]
fn reads_credentials_and_overrides() {
    let config = Config::from_vars(vars(&[
        ("TICKER", "PLTR"),
        ("EMAIL", "analyst@example.com"),
        ("ALPHA_VANTAGE_API_KEY", "   "),
        ("SEC_RATE_LIMIT", "9"),
        ("RATE_LIMIT_MODE", "fail-fast"),
        ("HTTP_TIMEOUT_SECS", "5"),
    ]))
    .unwrap();

    assert_eq!(config.ticker.as_deref(), Some("PLTR"));
    assert_eq!(config.email.as_deref(), Some("analyst@example.com"));
    assert_eq!(config.alpha_vantage_api_key, None);
    assert_eq!(config.sec_rate.max_calls.get(), 9);
    assert_eq!(config.sec_rate.window, Duration::from_secs(1));
    assert_eq!(config.alpha_vantage_rate.max_calls.get(), 5);
    assert_eq!(config.alpha_vantage_rate.window, Duration::from_secs(60));
    assert_eq!(config.rate_limit_mode, RateLimitMode::FailFast);
    assert_eq!(config.timeout, Duration::from_secs(5));
}

#[test]
fn rejects_zero_and_garbage_limits() {
    assert!(matches!(
        Config::from_vars(vars(&[("SEC_RATE_LIMIT", "0")])),
        Err(ConfigError::Invalid {
            var: "SEC_RATE_LIMIT",
            ..
        })
    ));
    assert!(Config::from_vars(vars(&[("FRED_RATE_LIMIT", "lots")])).is_err());
    assert!(Config::from_vars(vars(&[("RATE_LIMIT_MODE", "maybe")])).is_err());
    assert!(matches!(
        Config::from_vars(vars(&[("HTTP_TIMEOUT_SECS", "0")])),
        Err(ConfigError::Invalid {
            var: "HTTP_TIMEOUT_SECS",
            ..
        })
    ));
}

#[test]
fn blank_keys_count_as_missing() {
    let config = Config {
        alpha_vantage_api_key: Some("   ".to_string()),
        fred_api_key: Some("\t".to_string()),
        ..Config::default()
    };
    assert_eq!(config.alpha_vantage_key(), None);
    assert_eq!(config.fred_key(), None);

    let config = Config {
        alpha_vantage_api_key: Some(" demo ".to_string()),
        ..Config::default()
    };
    assert_eq!(config.alpha_vantage_key(), Some("demo"));
}
