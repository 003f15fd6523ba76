//! Web search for a specific comic, scoped to the comic's domain.
//!
//! Two interchangeable providers: Google Custom Search and the DuckDuckGo
//! HTML endpoint.

use crate::http::{HttpError, Transport};
use ::scraper::{Html, Selector};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

const GOOGLE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
const DUCKDUCKGO_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("missing {0} for search")]
    MissingCredential(&'static str),
    #[error("no results")]
    NoResults,
    #[error("unknown search engine: {0}")]
    UnknownEngine(String),
}

/// The search backends a scraper can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    Google,
    #[default]
    DuckDuckGo,
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchEngine::Google => f.write_str("google"),
            SearchEngine::DuckDuckGo => f.write_str("duckduckgo"),
        }
    }
}

impl FromStr for SearchEngine {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(SearchEngine::Google),
            "duckduckgo" | "ddg" => Ok(SearchEngine::DuckDuckGo),
            other => Err(SearchError::UnknownEngine(other.to_string())),
        }
    }
}

/// Where a search is allowed to look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchScope {
    /// Domain filter, e.g. `www.xkcd.com/`
    pub domain: String,
    /// Google custom search engine id for this site
    pub cse_id: Option<String>,
}

impl SearchScope {
    pub fn new(domain: impl Into<String>, cse_id: Option<String>) -> Self {
        Self {
            domain: domain.into(),
            cse_id,
        }
    }
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn engine(&self) -> SearchEngine;

    /// URL of the single best match, if any
    async fn top_result(
        &self,
        query: &str,
        scope: &SearchScope,
    ) -> Result<Option<String>, SearchError>;
}

/// Run a search, treating "no results" as an empty answer rather than an error
pub async fn search_top_hit(
    provider: &dyn SearchProvider,
    query: &str,
    scope: &SearchScope,
) -> Result<Option<String>, SearchError> {
    match provider.top_result(query, scope).await {
        Err(SearchError::NoResults) => Ok(None),
        other => other,
    }
}

pub fn provider_for(
    engine: SearchEngine,
    google_key: Option<String>,
    http: Arc<dyn Transport>,
) -> Arc<dyn SearchProvider> {
    match engine {
        SearchEngine::Google => Arc::new(GoogleSearch::new(http, google_key)),
        SearchEngine::DuckDuckGo => Arc::new(DuckDuckGoSearch::new(http)),
    }
}

/// Google Custom Search JSON API.
pub struct GoogleSearch {
    http: Arc<dyn Transport>,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    items: Vec<GoogleItem>,
}

#[derive(Debug, Deserialize)]
struct GoogleItem {
    link: String,
}

impl GoogleSearch {
    pub fn new(http: Arc<dyn Transport>, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }

    fn request_url(&self, query: &str, scope: &SearchScope) -> Result<String, SearchError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(SearchError::MissingCredential("GOOGLE_API_KEY"))?;
        let cx = scope
            .cse_id
            .as_deref()
            .ok_or(SearchError::MissingCredential("custom search engine id"))?;

        let url = Url::parse_with_params(
            GOOGLE_ENDPOINT,
            &[("key", key), ("cx", cx), ("q", query), ("num", "1")],
        )
        .expect("static endpoint is a valid URL");
        Ok(url.into())
    }
}

#[async_trait]
impl SearchProvider for GoogleSearch {
    fn engine(&self) -> SearchEngine {
        SearchEngine::Google
    }

    async fn top_result(
        &self,
        query: &str,
        scope: &SearchScope,
    ) -> Result<Option<String>, SearchError> {
        let url = self.request_url(query, scope)?;
        let response: GoogleResponse = self.http.get(&url).await?.json()?;
        Ok(response.items.into_iter().next().map(|item| item.link))
    }
}

/// DuckDuckGo's JavaScript-free HTML results page.
pub struct DuckDuckGoSearch {
    http: Arc<dyn Transport>,
}

impl DuckDuckGoSearch {
    pub fn new(http: Arc<dyn Transport>) -> Self {
        Self { http }
    }

    fn request_url(query: &str, scope: &SearchScope) -> String {
        let scoped = format!("{} site:{}", query, scope.domain);
        Url::parse_with_params(DUCKDUCKGO_ENDPOINT, &[("q", scoped.as_str())])
            .expect("static endpoint is a valid URL")
            .into()
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    fn engine(&self) -> SearchEngine {
        SearchEngine::DuckDuckGo
    }

    async fn top_result(
        &self,
        query: &str,
        scope: &SearchScope,
    ) -> Result<Option<String>, SearchError> {
        let url = Self::request_url(query, scope);
        let response = self.http.get(&url).await?;
        parse_duckduckgo_results(&response.body)
    }
}

/// First organic result link from a DuckDuckGo HTML results page
fn parse_duckduckgo_results(html: &str) -> Result<Option<String>, SearchError> {
    let document = Html::parse_document(html);
    let result_selector = Selector::parse(".result").unwrap();
    let link_selector = Selector::parse(".result__a").unwrap();
    let no_results_selector = Selector::parse(".no-results").unwrap();

    if document.select(&no_results_selector).next().is_some() {
        return Err(SearchError::NoResults);
    }

    for element in document.select(&result_selector) {
        // Skip ads
        if let Some(class) = element.value().attr("class") {
            if class.contains("result--ad") {
                continue;
            }
        }

        if let Some(href) = element
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
        {
            return Ok(Some(clean_duckduckgo_url(href)));
        }
    }

    Ok(None)
}

/// Unwrap DuckDuckGo's `/l/?uddg=<target>` redirect links
fn clean_duckduckgo_url(raw_url: &str) -> String {
    let mut url_str = raw_url.trim().to_string();

    if url_str.starts_with("//") {
        url_str = format!("https:{}", url_str);
    } else if url_str.starts_with('/') {
        url_str = format!("https://duckduckgo.com{}", url_str);
    }

    if let Ok(parsed) = Url::parse(&url_str) {
        if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == "uddg") {
            return target.into_owned();
        }
    }

    url_str
}
