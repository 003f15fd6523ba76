//! monkeyuser.com: HTML pages, random comics picked from the JSON site index.

use super::page::{comic_image, random_link, resolve_url};
use super::{ComicSite, PageOutcome, ScraperError};
use crate::comic::{is_animated, ComicRecord, ComicSource};
use crate::http::Transport;
use ::scraper::Html;
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use serde::Deserialize;

const BASE_URL: &str = "https://www.monkeyuser.com";
const LATEST_URL: &str = "https://www.monkeyuser.com/";
const INDEX_URL: &str = "https://www.monkeyuser.com/index.json";
const CONTAINER: &str = "div.content";

#[derive(Debug, Deserialize)]
struct IndexEntry {
    url: String,
}

pub struct MonkeyUser;

#[async_trait]
impl ComicSite for MonkeyUser {
    fn source(&self) -> ComicSource {
        ComicSource::MonkeyUser
    }

    fn search_domain(&self) -> &'static str {
        "www.monkeyuser.com/"
    }

    fn latest_comic_url(&self) -> &'static str {
        LATEST_URL
    }

    async fn random_comic_url(&self, http: &dyn Transport) -> Result<String, ScraperError> {
        let index: Vec<IndexEntry> = http.get(INDEX_URL).await?.json()?;
        pick_random(&index)
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

fn pick_random(index: &[IndexEntry]) -> Result<String, ScraperError> {
    let entry = index
        .choose(&mut rand::rng())
        .ok_or_else(|| ScraperError::RandomIndex("index.json lists no comics".into()))?;
    resolve_url(BASE_URL, &entry.url)
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

    // The title attribute carries the comic title; alt is the caption
    let title = image
        .title
        .or_else(|| Some(image.alt.clone()).filter(|alt| !alt.is_empty()))
        .ok_or(ScraperError::MissingElement("img[title]"))?;
    Ok(PageOutcome::Comic(ComicRecord::new(
        title,
        image.alt,
        image.src,
        page_url,
        ComicSource::MonkeyUser,
    )))
}
