//! HTTP transport used by the scrapers and search providers.
//!
//! Uses reqwest behind a small trait so pipelines can be driven by canned
//! responses in tests.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Some comic sites refuse non-browser agents
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default timeout for HTTP requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("invalid JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A fetched response body together with where the request ended up.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// URL after following redirects
    pub final_url: String,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, final_url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            final_url: final_url.into(),
            body: body.into(),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_str(&self.body).map_err(|source| HttpError::Json {
            url: self.final_url.clone(),
            source,
        })
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// GET a URL, following redirects. Error statuses are errors.
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError>;
}

/// reqwest-backed transport sharing one connection pool.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, HttpError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Err(HttpError::Status {
                url: final_url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        Ok(HttpResponse::new(status.as_u16(), final_url, body))
    }
}
