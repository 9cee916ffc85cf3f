use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::base_path::BasePath;
use crate::content::{from_toml_datetime, parse_front_matter};
use crate::markdown::first_heading;

/// The path of a page relative to the content root, using `/` separators
/// (e.g. `guide/01-introduction.md`).
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct PagePath(String);

impl fmt::Display for PagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PagePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the [`PagePath`] of a file inside `root_path`, or `None` when
    /// the file lies outside of it or its path is not valid UTF-8.
    pub fn from_file_path(root_path: impl AsRef<Path>, file_path: impl AsRef<Path>) -> Option<Self> {
        let relative = file_path.as_ref().strip_prefix(root_path).ok()?;

        let components = relative
            .components()
            .map(|component| component.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;

        if components.is_empty() {
            return None;
        }

        Some(Self(components.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the directory containing the page, relative to the content root.
    pub fn dir(&self) -> &str {
        self.0.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    /// Returns the file name without its `.md` extension.
    pub fn stem(&self) -> &str {
        let file_name = self.0.rsplit('/').next().unwrap_or(&self.0);
        file_name.strip_suffix(".md").unwrap_or(file_name)
    }

    /// Returns the path of the rendered file, relative to the output directory.
    pub fn output_path(&self) -> String {
        match self.0.strip_suffix(".md") {
            Some(stem) => format!("{stem}.html"),
            None => format!("{}.html", self.0),
        }
    }

    /// Returns the URL the rendered page is served at.
    pub fn url(&self, base: &BasePath) -> String {
        if self.0 == "index.md" {
            return base.join("");
        }

        if let Some(dir) = self.0.strip_suffix("/index.md") {
            return base.join(&format!("{dir}/"));
        }

        base.join(&self.output_path())
    }
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
pub struct PageFrontMatter {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, alias = "lastUpdated", deserialize_with = "from_toml_datetime")]
    pub last_updated: Option<String>,
}

#[derive(Error, Debug)]
pub enum ContentParseError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid front matter in '{}' at line {line}: {message}", path.display())]
    InvalidFrontMatter {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

#[derive(Debug)]
pub struct Page {
    pub path: PagePath,
    pub file_path: PathBuf,
    pub meta: PageFrontMatter,
    pub title: String,
    pub raw_content: String,
    /// The line in the source file the Markdown body starts on.
    pub content_line: usize,
}

impl Page {
    pub fn from_path(root_path: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<Self, ContentParseError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ContentParseError::Io {
            path: path.to_owned(),
            source,
        })?;

        let page_path =
            PagePath::from_file_path(root_path, path).ok_or_else(|| ContentParseError::Io {
                path: path.to_owned(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "page path is not valid UTF-8",
                ),
            })?;

        Self::parse(&contents, page_path, path)
    }

    pub fn parse(text: &str, path: PagePath, file_path: &Path) -> Result<Self, ContentParseError> {
        let document = parse_front_matter::<PageFrontMatter>(text).map_err(|err| {
            ContentParseError::InvalidFrontMatter {
                path: file_path.to_owned(),
                line: err.line,
                message: err.message,
            }
        })?;

        let meta = document.front_matter.unwrap_or_default();

        let title = meta
            .title
            .clone()
            .or_else(|| first_heading(document.body))
            .unwrap_or_else(|| path.stem().to_string());

        Ok(Self {
            path,
            file_path: file_path.to_owned(),
            meta,
            title,
            raw_content: document.body.to_string(),
            content_line: document.body_line,
        })
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(path: &str, text: &str) -> Page {
        Page::parse(text, PagePath::new(path), Path::new(path)).unwrap()
    }

    #[test]
    fn test_page_path_from_file_path() {
        assert_eq!(
            PagePath::from_file_path("docs", "docs/guide/01-introduction.md"),
            Some(PagePath::new("guide/01-introduction.md"))
        );
        assert_eq!(
            PagePath::from_file_path("docs", "docs/index.md"),
            Some(PagePath::new("index.md"))
        );
        assert_eq!(PagePath::from_file_path("docs", "other/index.md"), None);
    }

    #[test]
    fn test_page_path_urls() {
        let base = BasePath::parse("/airbnb/").unwrap();

        assert_eq!(PagePath::new("index.md").url(&base), "/airbnb/");
        assert_eq!(PagePath::new("guide/index.md").url(&base), "/airbnb/guide/");
        assert_eq!(
            PagePath::new("guide/02-setup.md").url(&base),
            "/airbnb/guide/02-setup.html"
        );
        assert_eq!(
            PagePath::new("guide/02-setup.md").output_path(),
            "guide/02-setup.html"
        );
        assert_eq!(PagePath::new("guide/02-setup.md").dir(), "guide");
        assert_eq!(PagePath::new("index.md").dir(), "");
    }

    #[test]
    fn test_title_from_front_matter() {
        let page = parse(
            "guide/01.md",
            indoc! {r#"
                +++
                title = "Introduction"
                last_updated = 2024-03-01
                +++

                # Something else
            "#},
        );

        assert_eq!(page.title, "Introduction");
        assert_eq!(page.meta.last_updated.as_deref(), Some("2024-03-01"));
        assert_eq!(page.content_line, 6);
    }

    #[test]
    fn test_title_from_first_heading() {
        let page = parse("guide/02.md", "Intro text.\n\n# Project Setup\n\n## Vite\n");

        assert_eq!(page.title, "Project Setup");
    }

    #[test]
    fn test_title_falls_back_to_file_stem() {
        let page = parse("guide/03-components.md", "No headings here.\n");

        assert_eq!(page.title, "03-components");
    }

    #[test]
    fn test_invalid_front_matter_names_file_and_line() {
        let err = Page::parse(
            "---\ntitle: [oops\n---\n",
            PagePath::new("guide/04.md"),
            Path::new("docs/guide/04.md"),
        )
        .unwrap_err();

        match err {
            ContentParseError::InvalidFrontMatter { path, line, .. } => {
                assert_eq!(path, PathBuf::from("docs/guide/04.md"));
                assert!(line >= 2);
            }
            err => panic!("unexpected error: {err}"),
        }
    }
}
