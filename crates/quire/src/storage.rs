use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;

/// Where a rendered site is written to.
///
/// Paths are relative to the root of the bundle and use `/` separators
/// (e.g. `guide/01-introduction.html`).
pub trait Store {
    type Error: std::error::Error + Send + Sync + 'static;

    fn store_file(&self, path: &str, contents: Vec<u8>) -> Result<(), Self::Error>;

    fn store_rendered_page(&self, path: &str, rendered_html: String) -> Result<(), Self::Error> {
        self.store_file(path, rendered_html.into_bytes())
    }

    fn store_css(&self, path: &str, css: String) -> Result<(), Self::Error> {
        self.store_file(path, css.into_bytes())
    }
}

/// Writes the site into a directory on disk.
pub struct DiskStorage {
    output_path: PathBuf,
}

impl DiskStorage {
    pub fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

impl Store for DiskStorage {
    type Error = io::Error;

    fn store_file(&self, path: &str, contents: Vec<u8>) -> Result<(), Self::Error> {
        let output_path = self.output_path.join(path);

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&output_path, contents)
    }
}

/// The files of a site held in memory, keyed by their path in the bundle.
pub type SiteFiles = Arc<RwLock<BTreeMap<String, Vec<u8>>>>;

/// Writes the site into memory, for serving it during development.
pub struct InMemoryStorage {
    storage: SiteFiles,
}

impl InMemoryStorage {
    pub fn new(storage: SiteFiles) -> Self {
        Self { storage }
    }
}

#[derive(Error, Debug)]
pub enum InMemoryStorageError {
    #[error("poisoned")]
    Poisoned,
}

impl Store for InMemoryStorage {
    type Error = InMemoryStorageError;

    fn store_file(&self, path: &str, contents: Vec<u8>) -> Result<(), Self::Error> {
        self.storage
            .write()
            .map_err(|_| InMemoryStorageError::Poisoned)?
            .insert(path.trim_start_matches('/').to_string(), contents);

        Ok(())
    }
}
