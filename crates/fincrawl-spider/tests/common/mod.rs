#![allow(dead_code)]

use async_trait::async_trait;
use fincrawl_spider::*;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use std::sync::{Arc, Mutex};

pub const BASE: &str = "http://fake.test/";

struct Route {
    path: String,
    query: Option<(String, String)>,
    response: HttpResponse,
}

/// Canned responses by path (and optionally one query parameter); records every request.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, path: &str, status: u16, body: &str) {
        self.push(path, None, status, body);
    }

    pub fn route_query(&self, path: &str, (key, value): (&str, &str), status: u16, body: &str) {
        self.push(path, Some((key.to_string(), value.to_string())), status, body);
    }

    /// Answer `path` with a fully built response, headers included.
    pub fn respond(&self, path: &str, response: HttpResponse) {
        self.routes.lock().unwrap().push(Route {
            path: path.to_string(),
            query: None,
            response,
        });
    }

    fn push(&self, path: &str, query: Option<(String, String)>, status: u16, body: &str) {
        self.routes.lock().unwrap().push(Route {
            path: path.to_string(),
            query,
            response: HttpResponse {
                status: StatusCode::from_u16(status).unwrap(),
                headers: HeaderMap::new(),
                body: body.to_string(),
            },
        });
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|request| request.url.path() == path)
            .count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        self.calls.lock().unwrap().push(request.clone());

        let routes = self.routes.lock().unwrap();
        let route = routes.iter().find(|route| {
            route.path == request.url.path()
                && route.query.as_ref().map_or(true, |(key, value)| {
                    request
                        .url
                        .query_pairs()
                        .any(|(k, v)| k == key.as_str() && v == value.as_str())
                })
        });

        Ok(match route {
            Some(route) => route.response.clone(),
            None => HttpResponse {
                status: StatusCode::NOT_FOUND,
                headers: HeaderMap::new(),
                body: String::new(),
            },
        })
    }
}

/// Fully credentialed config pointing every provider at the fake.
pub fn config() -> Config {
    Config {
        ticker: Some("PLTR".to_string()),
        email: Some("analyst@example.com".to_string()),
        alpha_vantage_api_key: Some("demo".to_string()),
        fred_api_key: Some("demo".to_string()),
        endpoints: Endpoints::all_at(Url::parse(BASE).unwrap()),
        ..Config::default()
    }
}

pub fn session(config: Config, transport: &Arc<FakeTransport>) -> Session {
    Session::with_transport(config, transport.clone())
}

pub fn fixture(name: &str) -> String {
    let path = format!("{}/tests/files/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(&path).unwrap_or_else(|err| panic!("fixture {path}: {err}"))
}
