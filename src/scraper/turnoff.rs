//! turnoff.us: HTML pages, random comics picked from the homepage's inline page list.

use super::page::{comic_image, random_link, resolve_url};
use super::{ComicSite, PageOutcome, ScraperError};
use crate::comic::{is_animated, ComicRecord, ComicSource};
use crate::http::Transport;
use ::scraper::Html;
use async_trait::async_trait;
use lazy_static::lazy_static;
use rand::seq::IndexedRandom;
use regex::Regex;

const BASE_URL: &str = "https://turnoff.us/";
const CONTAINER: &str = "article.post-content";

lazy_static! {
    static ref PAGES_PATTERN: Regex =
        Regex::new(r"(?s)var pages = (\[.*?\]);").expect("pages pattern is valid");
}

pub struct TurnoffUs;

#[async_trait]
impl ComicSite for TurnoffUs {
    fn source(&self) -> ComicSource {
        ComicSource::TurnoffUs
    }

    fn search_domain(&self) -> &'static str {
        "turnoff.us/geek/"
    }

    fn latest_comic_url(&self) -> &'static str {
        BASE_URL
    }

    async fn random_comic_url(&self, http: &dyn Transport) -> Result<String, ScraperError> {
        let homepage = http.get(BASE_URL).await?;
        random_url_from_homepage(&homepage.body)
    }

    async fn fetch_page(
        &self,
        http: &dyn Transport,
        url: &str,
    ) -> Result<PageOutcome, ScraperError> {
        let response = http.get(url).await?;
        parse_page(&response.final_url, &response.body)
    }
}

/// Pull the `var pages = [...]` list of comic paths out of the homepage
fn extract_pages(html: &str) -> Result<Vec<String>, ScraperError> {
    let captures = PAGES_PATTERN
        .captures(html)
        .ok_or_else(|| ScraperError::RandomIndex("page list not found on homepage".into()))?;
    serde_json::from_str(&captures[1])
        .map_err(|e| ScraperError::RandomIndex(format!("page list is not a JSON array: {e}")))
}

pub(crate) fn random_url_from_homepage(html: &str) -> Result<String, ScraperError> {
    let pages = extract_pages(html)?;
    let path = pages
        .choose(&mut rand::rng())
        .ok_or_else(|| ScraperError::RandomIndex("page list is empty".into()))?;
    resolve_url(BASE_URL, path)
}

fn parse_page(page_url: &str, html: &str) -> Result<PageOutcome, ScraperError> {
    let document = Html::parse_document(html);
    let image = comic_image(&document, CONTAINER, BASE_URL)?;

    if is_animated(&image.src) {
        return Ok(PageOutcome::Animated {
            next: random_link(&document, BASE_URL)?,
            image_url: image.src,
        });
    }

    // turnoff.us has no separate title attribute; the alt text is the title
    if image.alt.is_empty() {
        return Err(ScraperError::MissingElement("img[alt]"));
    }
    Ok(PageOutcome::Comic(ComicRecord::new(
        image.alt.clone(),
        image.alt,
        image.src,
        page_url,
        ComicSource::TurnoffUs,
    )))
}
