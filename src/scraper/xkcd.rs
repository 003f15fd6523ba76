//! xkcd: two-stage fetch through the site's JSON metadata endpoint.

use super::{ComicSite, PageOutcome, ScraperError};
use crate::comic::{is_animated, ComicRecord, ComicSource};
use crate::http::Transport;
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

const BASE_URL: &str = "https://xkcd.com/";
/// Redirects to a random comic page
pub(crate) const RANDOM_URL: &str = "https://c.xkcd.com/random/comic/";

#[derive(Debug, Deserialize)]
struct ComicInfo {
    num: u32,
    img: String,
    #[serde(default)]
    alt: String,
    title: String,
}

impl ComicInfo {
    fn into_outcome(self) -> PageOutcome {
        if is_animated(&self.img) {
            return PageOutcome::Animated {
                image_url: self.img,
                next: RANDOM_URL.to_string(),
            };
        }

        PageOutcome::Comic(ComicRecord::new(
            self.title,
            self.alt,
            self.img,
            permalink(self.num),
            ComicSource::Xkcd,
        ))
    }
}

pub struct Xkcd;

#[async_trait]
impl ComicSite for Xkcd {
    fn source(&self) -> ComicSource {
        ComicSource::Xkcd
    }

    fn search_domain(&self) -> &'static str {
        "www.xkcd.com/"
    }

    fn latest_comic_url(&self) -> &'static str {
        BASE_URL
    }

    async fn random_comic_url(&self, _http: &dyn Transport) -> Result<String, ScraperError> {
        Ok(RANDOM_URL.to_string())
    }

    async fn fetch_page(
        &self,
        http: &dyn Transport,
        url: &str,
    ) -> Result<PageOutcome, ScraperError> {
        // The page request only resolves redirects to the canonical comic URL
        let page = http.get(url).await?;
        let info: ComicInfo = http.get(&metadata_url(&page.final_url)?).await?.json()?;
        Ok(info.into_outcome())
    }
}

/// `info.0.json` under the comic's path, ignoring any query or fragment
fn metadata_url(canonical_url: &str) -> Result<String, ScraperError> {
    let invalid = |source: url::ParseError| ScraperError::InvalidUrl {
        url: canonical_url.to_string(),
        source,
    };

    let mut url = Url::parse(canonical_url).map_err(invalid)?;
    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url.join("info.0.json").map_err(invalid)?.into())
}

fn permalink(num: u32) -> String {
    format!("{BASE_URL}{num}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_url_follows_canonical_page() {
        assert_eq!(metadata_url("https://xkcd.com/353/").unwrap(), "https://xkcd.com/353/info.0.json");
        assert_eq!(metadata_url("https://xkcd.com/").unwrap(), "https://xkcd.com/info.0.json");
        assert_eq!(metadata_url("https://xkcd.com/1000").unwrap(), "https://xkcd.com/1000/info.0.json");
    }

    #[test]
    fn metadata_url_drops_query_and_fragment() {
        assert_eq!(
            metadata_url("https://xkcd.com/327/?ref=search#comic").unwrap(),
            "https://xkcd.com/327/info.0.json"
        );
        assert_eq!(
            metadata_url("https://xkcd.com/327?ref=x").unwrap(),
            "https://xkcd.com/327/info.0.json"
        );
        assert!(matches!(
            metadata_url("not a url"),
            Err(ScraperError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn static_metadata_becomes_a_record() {
        let info: ComicInfo = serde_json::from_str(
            r#"{"month":"12","num":353,"link":"","year":"2007","news":"",
                "safe_title":"Python","transcript":"",
                "alt":"I wrote 20 short programs in Python yesterday.",
                "img":"https://imgs.xkcd.com/comics/python.png","title":"Python","day":"5"}"#,
        )
        .unwrap();

        match info.into_outcome() {
            PageOutcome::Comic(record) => {
                assert_eq!(record.title, "Python");
                assert_eq!(record.source_url, "https://xkcd.com/353/");
                assert_eq!(record.image_url, "https://imgs.xkcd.com/comics/python.png");
                assert_eq!(record.description, "I wrote 20 short programs in Python yesterday.");
                assert_eq!(record.source, ComicSource::Xkcd);
            }
            other => panic!("expected a comic, got {other:?}"),
        }
    }

    #[test]
    fn animated_metadata_redirects_to_random() {
        let info = ComicInfo {
            num: 1190,
            img: "https://imgs.xkcd.com/comics/time.gif".to_string(),
            alt: String::new(),
            title: "Time".to_string(),
        };
        assert_eq!(
            info.into_outcome(),
            PageOutcome::Animated {
                image_url: "https://imgs.xkcd.com/comics/time.gif".to_string(),
                next: RANDOM_URL.to_string(),
            }
        );
    }
}
