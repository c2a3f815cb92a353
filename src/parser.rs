//! Listing and landing page parsing
//!
//! The crawler consumes pages through the [`PageParser`] seam so the markup
//! dialect can be swapped without touching orchestration. The default
//! [`HtmlPageParser`] understands the repository search markup: a
//! `ul.repo-list` of result links, a `div.pagination` next-page control,
//! and a `get-repo-btn` archive link on each repository landing page.

use crate::error::{Error, Result};
use crate::types::{RepoReference, SearchPage};
use scraper::{Html, Selector};
use url::Url;

/// Black-box page-parsing capability consumed by the orchestrator (listing
/// pages) and the pipeline (landing pages).
pub trait PageParser: Send + Sync {
    /// Parse a listing page into ordered references plus the next page URL.
    ///
    /// Absence of the expected structural elements is an error; the
    /// orchestrator treats it as fatal for the whole crawl.
    fn parse_listing(&self, page_url: &Url, body: &str) -> Result<SearchPage>;

    /// Extract the default-branch archive URL from a repository landing
    /// page. Absence of the archive control fails only that repository.
    fn parse_landing(&self, page_url: &Url, body: &str) -> Result<Url>;
}

/// Default parser for the repository search markup
#[derive(Debug, Default, Clone)]
pub struct HtmlPageParser;

// constant selectors are known-valid
#[allow(clippy::expect_used)]
fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("valid CSS selector")
}

impl PageParser for HtmlPageParser {
    fn parse_listing(&self, page_url: &Url, body: &str) -> Result<SearchPage> {
        let document = Html::parse_document(body);

        let list = document
            .select(&selector("ul.repo-list"))
            .next()
            .ok_or_else(|| Error::MalformedListing {
                url: page_url.to_string(),
                reason: "missing repo-list element".to_string(),
            })?;

        let mut references = Vec::new();
        for heading in list.select(&selector("h3")) {
            let href = heading
                .select(&selector("a"))
                .next()
                .and_then(|a| a.value().attr("href"))
                .ok_or_else(|| Error::MalformedListing {
                    url: page_url.to_string(),
                    reason: "result entry without a link".to_string(),
                })?;
            references.push(RepoReference::new(href));
        }

        let next_href = document
            .select(&selector("div.pagination"))
            .next()
            .and_then(|pagination| pagination.select(&selector(".next_page")).next())
            .and_then(|next| next.value().attr("href"))
            .ok_or_else(|| Error::MalformedListing {
                url: page_url.to_string(),
                reason: "missing next-page control".to_string(),
            })?;
        let next_page = page_url.join(next_href)?;

        Ok(SearchPage {
            references,
            next_page,
        })
    }

    fn parse_landing(&self, page_url: &Url, body: &str) -> Result<Url> {
        let document = Html::parse_document(body);
        let href = document
            .select(&selector(".get-repo-btn"))
            .next()
            .and_then(|control| control.value().attr("href"))
            .ok_or_else(|| Error::MalformedLandingPage {
                url: page_url.to_string(),
                reason: "missing archive control".to_string(),
            })?;
        Ok(page_url.join(href)?)
    }
}
