//! In-memory collaborators for driving scrapers without the network.

#![allow(dead_code)]

use async_trait::async_trait;
use comicbot::agent::{AgentError, ComicAnalysis, DescribeRequest, Describer};
use comicbot::http::{HttpError, HttpResponse, Transport};
use comicbot::scraper::{site_for, Scraper};
use comicbot::search::{SearchEngine, SearchError, SearchProvider, SearchScope};
use comicbot::ComicSource;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Route {
    final_url: String,
    body: String,
    status: u16,
    delay: Option<Duration>,
}

/// Canned responses keyed by request URL. Unknown URLs answer 404.
#[derive(Default)]
pub struct StubTransport {
    routes: HashMap<String, Route>,
    requests: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, body: &str) -> Self {
        self.redirect(url, url, body)
    }

    pub fn redirect(mut self, url: &str, final_url: &str, body: &str) -> Self {
        self.routes.insert(
            url.to_string(),
            Route {
                final_url: final_url.to_string(),
                body: body.to_string(),
                status: 200,
                delay: None,
            },
        );
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.routes.insert(
            url.to_string(),
            Route {
                final_url: url.to_string(),
                body: String::new(),
                status,
                delay: None,
            },
        );
        self
    }

    pub fn delayed(mut self, url: &str, millis: u64) -> Self {
        if let Some(route) = self.routes.get_mut(url) {
            route.delay = Some(Duration::from_millis(millis));
        }
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        self.requests.lock().unwrap().push(url.to_string());

        let Some(route) = self.routes.get(url) else {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: 404,
            });
        };

        if let Some(delay) = route.delay {
            tokio::time::sleep(delay).await;
        }

        if route.status >= 400 {
            return Err(HttpError::Status {
                url: route.final_url.clone(),
                status: route.status,
            });
        }

        Ok(HttpResponse::new(route.status, &route.final_url, &route.body))
    }
}

/// Search provider with a fixed answer
pub enum StubSearch {
    Hit(String),
    Empty,
    NoResultsError,
    Broken,
}

#[async_trait]
impl SearchProvider for StubSearch {
    fn engine(&self) -> SearchEngine {
        SearchEngine::DuckDuckGo
    }

    async fn top_result(
        &self,
        _query: &str,
        _scope: &SearchScope,
    ) -> Result<Option<String>, SearchError> {
        match self {
            StubSearch::Hit(url) => Ok(Some(url.clone())),
            StubSearch::Empty => Ok(None),
            StubSearch::NoResultsError => Err(SearchError::NoResults),
            StubSearch::Broken => Err(SearchError::MissingCredential("GOOGLE_API_KEY")),
        }
    }
}

/// Describer that echoes the request back, optionally after a delay
pub struct EchoDescriber {
    pub delay: Option<Duration>,
}

#[async_trait]
impl Describer for EchoDescriber {
    async fn describe(&self, request: &DescribeRequest<'_>) -> Result<ComicAnalysis, AgentError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(ComicAnalysis {
            core_concept: request.image_url.to_string(),
            explanation: format!("{}: {}", request.comic_name, request.alt_text),
        })
    }
}

pub struct FailingDescriber;

#[async_trait]
impl Describer for FailingDescriber {
    async fn describe(&self, _request: &DescribeRequest<'_>) -> Result<ComicAnalysis, AgentError> {
        Err(AgentError::RequestFailed("connection reset".to_string()))
    }
}

pub fn scraper(
    source: ComicSource,
    transport: &Arc<StubTransport>,
    search: StubSearch,
    describer: impl Describer + 'static,
) -> Scraper {
    Scraper::new(
        site_for(source),
        transport.clone(),
        Arc::new(search),
        Arc::new(describer),
    )
}

pub fn echo() -> EchoDescriber {
    EchoDescriber { delay: None }
}

/// A turnoff.us comic page
pub fn turnoff_page(image_src: &str, alt: &str, random_href: &str) -> String {
    format!(
        r#"<html><body>
        <article class="post-content"><p><img src="{image_src}" alt="{alt}"></p></article>
        <a id="random-link" href="{random_href}">random</a>
        </body></html>"#
    )
}

/// A monkeyuser.com comic page
pub fn monkeyuser_page(image_src: &str, alt: &str, title: &str) -> String {
    format!(
        r#"<html><body>
        <div class="content"><img src="{image_src}" alt="{alt}" title="{title}"></div>
        <a id="random-link" href="/2020/random/">random</a>
        </body></html>"#
    )
}
