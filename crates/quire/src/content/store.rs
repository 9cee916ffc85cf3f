use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::content::{ContentParseError, Page, PagePath, Pages};

#[derive(Error, Debug)]
pub enum LoadContentError {
    #[error("failed to walk content directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Parse(#[from] ContentParseError),
}

/// The Markdown pages under a content root.
#[derive(Debug)]
pub struct ContentStore {
    content_path: PathBuf,
    pages: Pages,
}

impl ContentStore {
    pub fn new(content_path: impl Into<PathBuf>, pages: Pages) -> Self {
        Self {
            content_path: content_path.into(),
            pages,
        }
    }

    /// Loads every `.md` file under `content_path`.
    ///
    /// Hidden files and directories are skipped, as is `public_path` when it
    /// lies inside the content root.
    pub fn load(
        content_path: impl AsRef<Path>,
        public_path: Option<&Path>,
    ) -> Result<Self, LoadContentError> {
        let content_path = content_path.as_ref();

        fn is_hidden(entry: &DirEntry) -> bool {
            entry.depth() > 0
                && entry
                    .file_name()
                    .to_str()
                    .map(|filename| filename.starts_with('.'))
                    .unwrap_or(false)
        }

        fn is_markdown(entry: &DirEntry) -> bool {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|extension| extension == "md")
                    .unwrap_or(false)
        }

        let walker = WalkDir::new(content_path)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !is_hidden(entry) && public_path.map_or(true, |public| entry.path() != public)
            });

        let mut pages = Pages::default();

        for entry in walker {
            let entry = entry?;
            if !is_markdown(&entry) {
                continue;
            }

            if PagePath::from_file_path(content_path, entry.path()).is_none() {
                tracing::warn!(path = %entry.path().display(), "skipping page with a non-UTF-8 path");
                continue;
            }

            let page = Page::from_path(content_path, entry.path())?;
            tracing::debug!(page = %page.path, "loaded page");

            pages.add(page);
        }

        Ok(Self::new(content_path, pages))
    }

    pub fn content_path(&self) -> &Path {
        &self.content_path
    }

    pub fn pages(&self) -> &Pages {
        &self.pages
    }

    pub fn get(&self, path: &PagePath) -> Option<&Page> {
        self.pages.get(path)
    }

    /// Returns the paths of all pages in the store.
    pub fn page_paths(&self) -> BTreeSet<PagePath> {
        self.pages.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    fn write(root: &Path, path: &str, contents: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_load_walks_content_root() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");

        write(&docs, "index.md", "# Home\n");
        write(&docs, "guide/02-setup.md", "# Setup\n");
        write(&docs, "guide/01-introduction.md", "# Introduction\n");
        write(&docs, "guide/notes.txt", "not a page");
        write(&docs, ".vitepress/config.md", "# Hidden\n");
        write(&docs, "public/readme.md", "# Copied, not rendered\n");

        let store = ContentStore::load(&docs, Some(&docs.join("public"))).unwrap();

        assert_eq!(
            store
                .page_paths()
                .iter()
                .map(PagePath::as_str)
                .collect::<Vec<_>>(),
            vec!["guide/01-introduction.md", "guide/02-setup.md", "index.md"]
        );
        assert_eq!(
            store.get(&PagePath::new("guide/02-setup.md")).unwrap().title,
            "Setup"
        );
    }

    #[test]
    fn test_load_fails_on_bad_front_matter() {
        let dir = tempfile::tempdir().unwrap();

        write(dir.path(), "broken.md", "+++\ntitle = = 3\n+++\n");

        let err = ContentStore::load(dir.path(), None).unwrap_err();

        match err {
            LoadContentError::Parse(ContentParseError::InvalidFrontMatter { path, line, .. }) => {
                assert_eq!(path, dir.path().join("broken.md"));
                assert_eq!(line, 2);
            }
            err => panic!("unexpected error: {err}"),
        }
    }

    #[test]
    fn test_load_fails_on_missing_root() {
        let dir = tempfile::tempdir().unwrap();

        let err = ContentStore::load(dir.path().join("missing"), None).unwrap_err();

        assert!(matches!(err, LoadContentError::Walk(_)));
    }
}
