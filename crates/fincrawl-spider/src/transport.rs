use crate::http::*;
use crate::{FetchError, Provider};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::{error, trace};

/// A GET request, fully built by a provider module.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub provider: Provider,
    pub url: Url,
    pub headers: HeaderMap,
}

impl HttpRequest {
    pub fn new(provider: Provider, url: Url) -> Self {
        Self {
            provider,
            url,
            headers: HeaderMap::new(),
        }
    }

    /// The URL without its query string; API keys travel in the query, so this is what gets
    /// logged.
    pub fn redacted_url(&self) -> String {
        let mut url = self.url.clone();
        url.set_query(None);
        url.to_string()
    }
}

/// Status, headers and the whole body of a response.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// The network seam; everything above it is provider logic, everything below is I/O.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, FetchError>;
}

/// [`Transport`] over a [`reqwest`] client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: HttpClient,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::ClientBuilder::new()
            .timeout(timeout)
            .gzip(true)
            .build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        let provider = request.provider;
        let target = request.redacted_url();

        trace!("GET {target}");
        let response = self
            .client
            .get(request.url)
            .headers(request.headers)
            .send()
            .await
            .map_err(|err| {
                error!("failed to fetch {target}, error({err})");
                FetchError::transport(provider, err)
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(|err| {
            error!("failed to read response body from {target}, error({err})");
            FetchError::transport(provider, err)
        })?;
        trace!("{status} from {target}, {} bytes", body.len());

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
