use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::content::PagePath;

static URL_SCHEME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*:").expect("failed to compile regex for URL schemes")
});

/// What a link written in the config or in a page points at.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum LinkTarget {
    /// A link with a scheme (`https:`, `mailto:`) or a protocol-relative link.
    External,

    /// A link to a fragment of the current page.
    Anchor,

    /// A link to a non-page file, such as an image.
    Asset,

    /// A link to a page in the content store.
    Page {
        path: PagePath,
        fragment: Option<String>,
    },

    /// A page link that climbs above the content root.
    Unresolvable,
}

/// Resolves `link` as written in a file located in `from_dir`.
///
/// `from_dir` is relative to the content root and uses `/` separators; pass
/// `""` to resolve relative to the content root itself.
pub fn resolve_link(link: &str, from_dir: &str) -> LinkTarget {
    let link = link.trim();

    if link.starts_with("//") || URL_SCHEME.is_match(link) {
        return LinkTarget::External;
    }

    if link.is_empty() || link.starts_with('#') {
        return LinkTarget::Anchor;
    }

    let (rest, fragment) = match link.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment.to_string())),
        None => (link, None),
    };
    let path = rest.split('?').next().unwrap_or_default();

    let file_name = path.rsplit('/').next().unwrap_or_default();
    if !matches!(file_name, "." | "..") {
        match Path::new(file_name)
            .extension()
            .and_then(|extension| extension.to_str())
        {
            None | Some("md") | Some("html") => {}
            Some(_) => return LinkTarget::Asset,
        }
    }

    let (mut segments, path) = match path.strip_prefix('/') {
        Some(path) => (Vec::new(), path),
        None => (
            from_dir
                .split('/')
                .filter(|segment| !segment.is_empty())
                .collect::<Vec<_>>(),
            path,
        ),
    };

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return LinkTarget::Unresolvable;
                }
            }
            segment => segments.push(segment),
        }
    }

    let is_directory =
        path.is_empty() || path.ends_with('/') || matches!(file_name, "." | "..");

    let page_path = if is_directory || segments.is_empty() {
        segments.push("index.md");
        segments.join("/")
    } else {
        let joined = segments.join("/");
        if let Some(stem) = joined.strip_suffix(".html") {
            format!("{stem}.md")
        } else if joined.ends_with(".md") {
            joined
        } else {
            format!("{joined}.md")
        }
    };

    LinkTarget::Page {
        path: PagePath::new(page_path),
        fragment,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn page(path: &str, fragment: Option<&str>) -> LinkTarget {
        LinkTarget::Page {
            path: PagePath::new(path),
            fragment: fragment.map(ToString::to_string),
        }
    }

    #[test]
    fn test_external_links() {
        assert_eq!(resolve_link("https://react.dev", ""), LinkTarget::External);
        assert_eq!(resolve_link("mailto:hi@example.com", ""), LinkTarget::External);
        assert_eq!(resolve_link("//cdn.example.com/x.js", ""), LinkTarget::External);
    }

    #[test]
    fn test_anchor_and_asset_links() {
        assert_eq!(resolve_link("#setup", "guide"), LinkTarget::Anchor);
        assert_eq!(resolve_link("", "guide"), LinkTarget::Anchor);
        assert_eq!(resolve_link("/images/listing.png", ""), LinkTarget::Asset);
        assert_eq!(resolve_link("../data/listings.json", "guide"), LinkTarget::Asset);
    }

    #[test]
    fn test_config_style_links() {
        assert_eq!(
            resolve_link("./guide/10-missing.md", ""),
            page("guide/10-missing.md", None)
        );
        assert_eq!(
            resolve_link("/guide/01-introduction", ""),
            page("guide/01-introduction.md", None)
        );
        assert_eq!(resolve_link("/", ""), page("index.md", None));
        assert_eq!(resolve_link("/guide/", ""), page("guide/index.md", None));
    }

    #[test]
    fn test_relative_page_links() {
        assert_eq!(
            resolve_link("./02-setup.md#install", "guide"),
            page("guide/02-setup.md", Some("install"))
        );
        assert_eq!(
            resolve_link("../index.html", "guide"),
            page("index.md", None)
        );
        assert_eq!(resolve_link("..", "guide"), page("index.md", None));
        assert_eq!(
            resolve_link("03-components?tab=1", "guide"),
            page("guide/03-components.md", None)
        );
    }

    #[test]
    fn test_links_above_the_root_are_unresolvable() {
        assert_eq!(resolve_link("../outside.md", ""), LinkTarget::Unresolvable);
        assert_eq!(
            resolve_link("../../outside.md", "guide"),
            LinkTarget::Unresolvable
        );
    }
}
