use crate::payload::{Body, PayloadKey};
use crate::rate_budget::RateBudget;
use crate::stock::sec::Tickers;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Transport};
use crate::{Config, FetchError, FetchRequest, Provider};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};

/// Everything a fetch needs: configuration, the transport, and one Rate Budget per provider.
///
/// Budgets live here rather than in globals; two sessions never share a budget, and every
/// fetch function takes the session it should count against.
pub struct Session {
    config: Config,
    transport: Arc<dyn Transport>,
    sec: RateBudget,
    alpha_vantage: RateBudget,
    fred: RateBudget,
    tickers: OnceCell<Tickers>,
}

impl Session {
    /// Session over a real HTTP client, honouring the configured timeout.
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let transport = HttpTransport::new(config.timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let budget = |provider| {
            RateBudget::new(
                provider,
                config.rate_policy(provider),
                config.rate_limit_mode,
            )
        };
        let sec = budget(Provider::Sec);
        let alpha_vantage = budget(Provider::AlphaVantage);
        let fred = budget(Provider::Fred);

        Self {
            config,
            transport,
            sec,
            alpha_vantage,
            fred,
            tickers: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn budget(&self, provider: Provider) -> &RateBudget {
        match provider {
            Provider::Sec => &self.sec,
            Provider::AlphaVantage => &self.alpha_vantage,
            Provider::Fred => &self.fred,
        }
    }

    /// The SEC ticker map, fetched on first use and kept for the life of the session.
    pub(crate) fn ticker_cache(&self) -> &OnceCell<Tickers> {
        &self.tickers
    }

    /// Spend one unit of the provider's budget, issue the request, and map failing HTTP statuses
    /// onto [`FetchError`]s.
    pub(crate) async fn send(
        &self,
        request: &FetchRequest,
        http: HttpRequest,
    ) -> Result<HttpResponse, FetchError> {
        let response = self.send_unchecked(request, http).await?;
        check_status(request, self.budget(request.provider).policy().window, response)
    }

    /// [`Session::send`] without the status mapping, for providers that explain failures in the
    /// body of a 4xx.
    pub(crate) async fn send_unchecked(
        &self,
        request: &FetchRequest,
        http: HttpRequest,
    ) -> Result<HttpResponse, FetchError> {
        self.budget(request.provider).acquire().await?;

        debug!("fetching {} {request}", request.provider);
        self.transport.get(http).await
    }

    /// [`Session::send`], keeping the whole response as a payload body.
    pub(crate) async fn fetch_body(
        &self,
        request: &FetchRequest,
        http: HttpRequest,
    ) -> Result<Body, FetchError> {
        let source = http.redacted_url();
        let response = self.send(request, http).await?;
        Ok(into_body(request, source, response))
    }
}

pub(crate) fn into_body(request: &FetchRequest, source: String, response: HttpResponse) -> Body {
    Body {
        key: PayloadKey {
            identifier: request.identifier.clone(),
            endpoint: request.endpoint,
        },
        source,
        headers: response.headers,
        text: response.body,
        fetched_at: chrono::Utc::now(),
    }
}

pub(crate) fn check_status(
    request: &FetchRequest,
    window: Duration,
    response: HttpResponse,
) -> Result<HttpResponse, FetchError> {
    let provider = request.provider;
    match response.status {
        status if status.is_success() => Ok(response),
        StatusCode::NOT_FOUND => {
            warn!("{provider} has no data for {request}");
            Err(request.not_found())
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            error!("{provider} refused {request}, status({})", response.status);
            Err(FetchError::auth(
                provider,
                format!("request refused with {}", response.status),
            ))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(window);
            warn!("{provider} throttled {request}, retry after {retry_after:?}");
            Err(FetchError::RateLimit {
                provider,
                retry_after,
            })
        }
        status => {
            error!("failed to fetch {request} from {provider}, status({status})");
            Err(FetchError::transport(
                provider,
                format!("unexpected status {status}"),
            ))
        }
    }
}
