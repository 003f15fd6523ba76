//! HTML helpers shared by the page-scraped sites.

use super::ScraperError;
use ::scraper::{Html, Selector};
use url::Url;

/// The comic `<img>` found on a page, with `src` already made absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImageTag {
    pub src: String,
    pub alt: String,
    pub title: Option<String>,
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// Find the first `<img>` inside the first element matching `container`.
pub(crate) fn comic_image(
    document: &Html,
    container: &'static str,
    base_url: &str,
) -> Result<ImageTag, ScraperError> {
    let container_selector = selector(container);
    let img_selector = selector("img");

    let element = document
        .select(&container_selector)
        .next()
        .ok_or(ScraperError::MissingElement(container))?;
    let img = element
        .select(&img_selector)
        .next()
        .ok_or(ScraperError::MissingElement("img"))?;

    let src = img
        .value()
        .attr("src")
        .ok_or(ScraperError::MissingElement("img[src]"))?;

    Ok(ImageTag {
        src: resolve_url(base_url, src)?,
        alt: img.value().attr("alt").unwrap_or_default().trim().to_string(),
        title: img
            .value()
            .attr("title")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
    })
}

/// The site's own "random comic" link, used to escape animated pages.
pub(crate) fn random_link(document: &Html, base_url: &str) -> Result<String, ScraperError> {
    let link_selector = selector("#random-link");
    let href = document
        .select(&link_selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .ok_or(ScraperError::MissingElement("#random-link"))?;
    resolve_url(base_url, href)
}

pub(crate) fn resolve_url(base_url: &str, href: &str) -> Result<String, ScraperError> {
    Url::parse(base_url)
        .and_then(|base| base.join(href.trim()))
        .map(String::from)
        .map_err(|source| ScraperError::InvalidUrl {
            url: href.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_and_absolute_sources() {
        assert_eq!(
            resolve_url("https://turnoff.us/", "/image/en/comic.png").unwrap(),
            "https://turnoff.us/image/en/comic.png"
        );
        assert_eq!(
            resolve_url("https://www.monkeyuser.com", "/2024/comic/").unwrap(),
            "https://www.monkeyuser.com/2024/comic/"
        );
        assert_eq!(
            resolve_url("https://turnoff.us/", "https://cdn.example.com/a.png").unwrap(),
            "https://cdn.example.com/a.png"
        );
    }

    #[test]
    fn finds_first_image_inside_container() {
        let html = r#"
            <img src="/logo.png" alt="logo">
            <div class="content">
                <p>intro</p>
                <img src="/comic.png" alt=" The joke " title="Title here">
                <img src="/second.png" alt="second">
            </div>
        "#;
        let document = Html::parse_document(html);
        let image = comic_image(&document, "div.content", "https://www.monkeyuser.com").unwrap();
        assert_eq!(
            image,
            ImageTag {
                src: "https://www.monkeyuser.com/comic.png".to_string(),
                alt: "The joke".to_string(),
                title: Some("Title here".to_string()),
            }
        );
    }

    #[test]
    fn missing_container_and_image_are_reported() {
        let document = Html::parse_document("<div class='other'><img src='/a.png'></div>");
        assert!(matches!(
            comic_image(&document, "div.content", "https://www.monkeyuser.com"),
            Err(ScraperError::MissingElement("div.content"))
        ));

        let document = Html::parse_document("<div class='content'><p>no image</p></div>");
        assert!(matches!(
            comic_image(&document, "div.content", "https://www.monkeyuser.com"),
            Err(ScraperError::MissingElement("img"))
        ));
    }

    #[test]
    fn random_link_is_resolved() {
        let document = Html::parse_document(r#"<a id="random-link" href="/geek/some-comic/">random</a>"#);
        assert_eq!(
            random_link(&document, "https://turnoff.us/").unwrap(),
            "https://turnoff.us/geek/some-comic/"
        );

        let document = Html::parse_document("<p>nothing</p>");
        assert!(random_link(&document, "https://turnoff.us/").is_err());
    }
}
