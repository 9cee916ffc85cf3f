use thiserror::Error;

use crate::html::HtmlElement;
use crate::permalink::Permalink;

#[derive(Error, Debug)]
pub enum SitemapError {
    #[error("invalid hostname '{hostname}': {source}")]
    InvalidHostname {
        hostname: String,
        source: url::ParseError,
    },

    #[error("render error: {0}")]
    Render(#[from] std::fmt::Error),
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SitemapEntry {
    pub permalink: Permalink,
    pub updated_at: Option<String>,
}

impl SitemapEntry {
    pub fn new(hostname: &str, url: &str, updated_at: Option<String>) -> Result<Self, SitemapError> {
        let permalink =
            Permalink::from_path(hostname, url).map_err(|source| SitemapError::InvalidHostname {
                hostname: hostname.to_string(),
                source,
            })?;

        Ok(Self {
            permalink,
            updated_at,
        })
    }
}

/// Renders `sitemap.xml` for the given entries, sorted by permalink.
pub fn render_sitemap(mut entries: Vec<SitemapEntry>) -> Result<String, SitemapError> {
    entries.sort();
    entries.dedup();

    let rendered = sitemap_template(entries).render_to_string()?;

    const XML_PROLOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

    Ok(format!("{XML_PROLOG}\n{rendered}\n"))
}

fn sitemap_template(entries: Vec<SitemapEntry>) -> HtmlElement {
    urlset()
        .attr("xmlns", "http://www.sitemaps.org/schemas/sitemap/0.9")
        .children(entries.into_iter().map(|entry| {
            url()
                .child(loc().child(entry.permalink.as_str()))
                .children(entry.updated_at.map(|updated_at| lastmod().child(updated_at)))
        }))
}

fn urlset() -> HtmlElement {
    HtmlElement::new("urlset")
}

fn url() -> HtmlElement {
    HtmlElement::new("url")
}

fn loc() -> HtmlElement {
    HtmlElement::new("loc")
}

fn lastmod() -> HtmlElement {
    HtmlElement::new("lastmod")
}
