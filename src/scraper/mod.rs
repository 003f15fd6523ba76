//! Comic scrapers.
//!
//! Each site implements [`ComicSite`]; [`Scraper`] composes a site with the
//! HTTP transport, a search provider and the LLM describer into the four
//! operations callers use: random, latest, search and describe.

mod monkeyuser;
mod page;
mod turnoff;
mod xkcd;

pub use monkeyuser::MonkeyUser;
pub use turnoff::TurnoffUs;
pub use xkcd::Xkcd;

use crate::agent::{self, Describer, GroqAgent};
use crate::analysis::Description;
use crate::comic::{ComicRecord, ComicSource};
use crate::config::Config;
use crate::http::{HttpError, Transport};
use crate::search::{self, SearchProvider, SearchScope};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Upper bound on page fetches while escaping animated placeholder pages
pub const MAX_PAGE_FETCHES: usize = 10;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("could not find {0} on the page")]
    MissingElement(&'static str),
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("cannot pick a random comic: {0}")]
    RandomIndex(String),
    #[error("still on an animated image after {0} page fetches")]
    AnimatedLoop(usize),
}

/// Result of scraping one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// A static comic image was found
    Comic(ComicRecord),
    /// The page shows an animated placeholder; `next` is the page to try instead
    Animated { image_url: String, next: String },
}

/// Per-site capabilities behind the shared scraper operations.
#[async_trait]
pub trait ComicSite: Send + Sync {
    fn source(&self) -> ComicSource;

    fn comic_name(&self) -> &'static str {
        self.source().name()
    }

    /// Domain filter handed to the search provider
    fn search_domain(&self) -> &'static str;

    fn latest_comic_url(&self) -> &'static str;

    async fn random_comic_url(&self, http: &dyn Transport) -> Result<String, ScraperError>;

    /// Fetch and parse a single page, without following animated pages
    async fn fetch_page(&self, http: &dyn Transport, url: &str)
        -> Result<PageOutcome, ScraperError>;
}

pub fn site_for(source: ComicSource) -> Box<dyn ComicSite> {
    match source {
        ComicSource::Xkcd => Box::new(Xkcd),
        ComicSource::TurnoffUs => Box::new(TurnoffUs),
        ComicSource::MonkeyUser => Box::new(MonkeyUser),
    }
}

/// Outcome of [`Scraper::search_comic`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(ComicRecord),
    /// The search provider had nothing for the query
    NoResults,
    /// Search or fetch failed; details are in the logs
    Failed,
}

impl SearchOutcome {
    pub fn into_comic(self) -> Option<ComicRecord> {
        match self {
            SearchOutcome::Found(record) => Some(record),
            _ => None,
        }
    }
}

/// A comic scraper for one site.
///
/// Holds no per-request state: describe takes the record it explains, so a
/// single scraper can serve any number of concurrent requests.
pub struct Scraper {
    site: Box<dyn ComicSite>,
    http: Arc<dyn Transport>,
    search: Arc<dyn SearchProvider>,
    describer: Arc<dyn Describer>,
    cse_id: Option<String>,
}

impl Scraper {
    pub fn new(
        site: Box<dyn ComicSite>,
        http: Arc<dyn Transport>,
        search: Arc<dyn SearchProvider>,
        describer: Arc<dyn Describer>,
    ) -> Self {
        Self {
            site,
            http,
            search,
            describer,
            cse_id: None,
        }
    }

    /// Set the site-specific Google custom search engine id
    pub fn with_cse_id(mut self, cse_id: Option<String>) -> Self {
        self.cse_id = cse_id;
        self
    }

    /// Build a scraper from the current settings.
    ///
    /// Settings changed later are only seen by scrapers built afterwards.
    pub fn from_config(source: ComicSource, config: &Config, http: Arc<dyn Transport>) -> Self {
        let settings = config.settings();
        let search = search::provider_for(
            settings.search_engine,
            config.api.google_key.clone(),
            http.clone(),
        );
        let describer = Arc::new(GroqAgent::from_config(config));

        Self::new(site_for(source), http, search, describer)
            .with_cse_id(config.sources.get(source).cse_id.clone())
    }

    pub fn source(&self) -> ComicSource {
        self.site.source()
    }

    pub fn comic_name(&self) -> &'static str {
        self.site.comic_name()
    }

    pub fn search_domain(&self) -> &'static str {
        self.site.search_domain()
    }

    /// Fetch the comic at `url`, hopping past animated placeholder pages.
    pub async fn fetch_content(&self, url: &str) -> Result<ComicRecord, ScraperError> {
        let mut target = url.to_string();

        for _ in 0..MAX_PAGE_FETCHES {
            match self.site.fetch_page(self.http.as_ref(), &target).await? {
                PageOutcome::Comic(record) => return Ok(record),
                PageOutcome::Animated { image_url, next } => {
                    debug!(
                        source = self.comic_name(),
                        %image_url,
                        %next,
                        "animated image, following random link"
                    );
                    target = next;
                }
            }
        }

        Err(ScraperError::AnimatedLoop(MAX_PAGE_FETCHES))
    }

    pub async fn random_comic(&self) -> Option<ComicRecord> {
        let url = match self.site.random_comic_url(self.http.as_ref()).await {
            Ok(url) => url,
            Err(e) => {
                error!(source = self.comic_name(), error = %e, "cannot get random comic URL");
                return None;
            }
        };
        self.fetch_logged(&url).await
    }

    pub async fn latest_comic(&self) -> Option<ComicRecord> {
        self.fetch_logged(self.site.latest_comic_url()).await
    }

    pub async fn search_comic(&self, query: &str) -> SearchOutcome {
        let scope = SearchScope::new(self.search_domain(), self.cse_id.clone());

        match search::search_top_hit(self.search.as_ref(), query, &scope).await {
            Ok(Some(link)) => match self.fetch_logged(&link).await {
                Some(record) => SearchOutcome::Found(record),
                None => SearchOutcome::Failed,
            },
            Ok(None) => {
                info!(
                    source = self.comic_name(),
                    engine = %self.search.engine(),
                    query,
                    "search: no results found"
                );
                SearchOutcome::NoResults
            }
            Err(e) => {
                warn!(
                    source = self.comic_name(),
                    engine = %self.search.engine(),
                    query,
                    error = %e,
                    "search failed"
                );
                SearchOutcome::Failed
            }
        }
    }

    /// Explain a comic. Model failures come back as the fallback description.
    pub async fn describe_comic(&self, record: &ComicRecord) -> Description {
        agent::explain(self.describer.as_ref(), record).await
    }

    async fn fetch_logged(&self, url: &str) -> Option<ComicRecord> {
        match self.fetch_content(url).await {
            Ok(record) => {
                info!(
                    source = self.comic_name(),
                    title = %record.title,
                    url = %record.source_url,
                    "fetched comic"
                );
                Some(record)
            }
            Err(e) => {
                error!(source = self.comic_name(), url, error = %e, "error fetching comic");
                None
            }
        }
    }
}
