//! Comic record - the normalized output of every site scraper.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The webcomic sites this bot knows how to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum ComicSource {
    #[serde(rename = "xkcd")]
    #[value(name = "xkcd")]
    Xkcd,
    #[serde(rename = "turnoff.us")]
    #[value(name = "turnoff", alias = "turnoff.us")]
    TurnoffUs,
    #[serde(rename = "monkeyuser.com")]
    #[value(name = "monkeyuser", alias = "monkeyuser.com")]
    MonkeyUser,
}

impl ComicSource {
    pub const ALL: [ComicSource; 3] = [
        ComicSource::Xkcd,
        ComicSource::TurnoffUs,
        ComicSource::MonkeyUser,
    ];

    /// Display name, also used in prompts and log lines
    pub fn name(self) -> &'static str {
        match self {
            ComicSource::Xkcd => "xkcd",
            ComicSource::TurnoffUs => "turnoff.us",
            ComicSource::MonkeyUser => "monkeyuser.com",
        }
    }
}

impl fmt::Display for ComicSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single fetched comic.
///
/// Only built once the page pipeline has landed on a static image, so
/// `image_url` never points at an animated placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComicRecord {
    /// Comic title
    pub title: String,
    /// Alt or caption text, also fed to the model as context
    pub description: String,
    /// Absolute URL of the comic image
    pub image_url: String,
    /// Absolute permalink of the comic page
    pub source_url: String,
    /// Site the comic came from
    pub source: ComicSource,
}

impl ComicRecord {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        image_url: impl Into<String>,
        source_url: impl Into<String>,
        source: ComicSource,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            image_url: image_url.into(),
            source_url: source_url.into(),
            source,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }
}

/// Whether an image URL points at an animated placeholder (a `.gif`).
pub fn is_animated(image_url: &str) -> bool {
    let path = match url::Url::parse(image_url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => image_url
            .split(['?', '#'])
            .next()
            .unwrap_or(image_url)
            .to_string(),
    };
    path.to_ascii_lowercase().ends_with(".gif")
}
