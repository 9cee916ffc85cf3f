//! Checks that the configured navigation and the links inside pages point at
//! pages that exist.

use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;

use crate::base_path::{BasePath, InvalidBasePath};
use crate::config::{NavEntry, SiteConfig, SocialLink};
use crate::content::{line_at, ContentStore, PagePath};
use crate::link::{resolve_link, LinkTarget};
use crate::markdown;

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ValidationError {
    #[error("broken link in navigation: '{label}' points to '{link}', which is not a page")]
    BrokenLink { label: String, link: String },

    #[error("broken link in '{}' at line {line}: '{link}' is not a page", file.display())]
    BrokenPageLink {
        page: PagePath,
        file: PathBuf,
        line: usize,
        link: String,
    },

    #[error(transparent)]
    InvalidBasePath(#[from] InvalidBasePath),
}

/// A navigation entry whose link has been resolved.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ResolvedNavEntry {
    pub label: String,
    pub url: String,
    /// The page the entry points at, or `None` for external links.
    pub page: Option<PagePath>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ResolvedSidebarGroup {
    pub label: String,
    pub collapsed: bool,
    pub items: Vec<ResolvedNavEntry>,
}

/// The navigation of a site, in the order it was configured.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Navigation {
    pub base: BasePath,
    pub nav: Vec<ResolvedNavEntry>,
    pub sidebar: Vec<ResolvedSidebarGroup>,
    pub social_links: Vec<SocialLink>,
}

/// Validates `config` against the pages that exist in the content store.
///
/// Stops at the first problem: the base path is checked first, then the
/// `nav` entries in order, then every sidebar item in order.
pub fn validate_site_config(
    config: &SiteConfig,
    pages: &BTreeSet<PagePath>,
) -> Result<Navigation, ValidationError> {
    let base = BasePath::parse(&config.base)?;

    let nav = config
        .nav
        .iter()
        .map(|entry| resolve_nav_entry(entry, &base, pages))
        .collect::<Result<Vec<_>, _>>()?;

    let sidebar = config
        .sidebar
        .iter()
        .map(|group| {
            Ok(ResolvedSidebarGroup {
                label: group.text.clone(),
                collapsed: group.collapsed,
                items: group
                    .items
                    .iter()
                    .map(|entry| resolve_nav_entry(entry, &base, pages))
                    .collect::<Result<Vec<_>, _>>()?,
            })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    Ok(Navigation {
        base,
        nav,
        sidebar,
        social_links: config.social_links.clone(),
    })
}

fn resolve_nav_entry(
    entry: &NavEntry,
    base: &BasePath,
    pages: &BTreeSet<PagePath>,
) -> Result<ResolvedNavEntry, ValidationError> {
    let broken = || ValidationError::BrokenLink {
        label: entry.text.clone(),
        link: entry.link.clone(),
    };

    let (url, page) = match resolve_link(&entry.link, "") {
        LinkTarget::Page { path, fragment } => {
            if !pages.contains(&path) {
                return Err(broken());
            }

            (with_fragment(path.url(base), fragment.as_deref()), Some(path))
        }
        LinkTarget::Unresolvable => return Err(broken()),
        LinkTarget::Asset if entry.link.starts_with('/') => (base.join(&entry.link), None),
        LinkTarget::External | LinkTarget::Anchor | LinkTarget::Asset => (entry.link.clone(), None),
    };

    Ok(ResolvedNavEntry {
        label: entry.text.clone(),
        url,
        page,
    })
}

/// Checks that every page link inside every page resolves to a page in the
/// store. Pages are checked in path order and the first broken link is
/// reported.
pub fn check_page_links(store: &ContentStore) -> Result<(), ValidationError> {
    for page in store.pages().values() {
        for link in markdown::links(&page.raw_content) {
            let exists = match resolve_link(&link.destination, page.path.dir()) {
                LinkTarget::Page { path, .. } => store.get(&path).is_some(),
                LinkTarget::Unresolvable => false,
                LinkTarget::External | LinkTarget::Anchor | LinkTarget::Asset => true,
            };

            if !exists {
                return Err(ValidationError::BrokenPageLink {
                    page: page.path.clone(),
                    file: page.file_path.clone(),
                    line: page.content_line + line_at(&page.raw_content, link.offset) - 1,
                    link: link.destination,
                });
            }
        }
    }

    Ok(())
}

pub(crate) fn with_fragment(url: String, fragment: Option<&str>) -> String {
    match fragment {
        Some(fragment) if !fragment.is_empty() => format!("{url}#{fragment}"),
        _ => url,
    }
}
