use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono_tz::Tz;
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::{ConfigError, ConfigOverrides, SiteConfig};
use crate::content::{ContentStore, LoadContentError, Page};
use crate::date::{format_date, InvalidDate};
use crate::layout::{
    not_found_content, render_page, PageToRender, RenderContext, LIVE_RELOAD_SCRIPT_PATH,
};
use crate::link::{resolve_link, LinkTarget};
use crate::markdown::render_markdown;
use crate::sitemap::{render_sitemap, SitemapEntry, SitemapError};
use crate::storage::{DiskStorage, Store};
use crate::style::{compile_theme, compile_theme_dir, theme_dir_sources, StyleError, THEME_CSS_PATH};
use crate::validate::{check_page_links, validate_site_config, with_fragment, Navigation, ValidationError};

const LAST_UPDATED_FORMAT: &str = "%B %-d, %Y";
const SITEMAP_DATE_FORMAT: &str = "%Y-%m-%d";

const NOT_FOUND_PATH: &str = "404.html";
const SITEMAP_PATH: &str = "sitemap.xml";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Content(#[from] LoadContentError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("unknown timezone '{0}'")]
    InvalidTimezone(String),

    #[error("invalid `last_updated` in '{}': {source}", path.display())]
    InvalidDate { path: PathBuf, source: InvalidDate },

    #[error("public file '{}' would overwrite the generated '{path}'", file.display())]
    OutputCollision { path: String, file: PathBuf },

    #[error(transparent)]
    Style(StyleError),

    #[error("failed to walk public directory: {0}")]
    Walk(walkdir::Error),

    #[error("refusing to use '{}' as the output directory: it contains the site sources", .0.display())]
    UnsafeOutputDir(PathBuf),

    #[error("failed to clear output directory '{}': {source}", path.display())]
    ClearOutput { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to render page: {0}")]
    Html(#[from] std::fmt::Error),

    #[error("invalid date in '{}': {source}", path.display())]
    Date { path: PathBuf, source: InvalidDate },

    #[error(transparent)]
    Style(#[from] StyleError),

    #[error(transparent)]
    Sitemap(#[from] SitemapError),

    #[error("failed to read '{}': {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to walk public directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("storage error: {0}")]
    Storage(String),
}

/// A loaded and validated documentation site.
#[derive(Debug)]
pub struct Site {
    root_path: PathBuf,
    config: SiteConfig,
    content: ContentStore,
    navigation: Navigation,
    timezone: Tz,
}

impl Site {
    /// Loads the site rooted at `root_path` using the configuration file at
    /// `config_path` (relative to the root unless absolute).
    pub fn load(
        root_path: impl AsRef<Path>,
        config_path: impl AsRef<Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self, BuildError> {
        let root_path = root_path.as_ref();
        let config_path = root_path.join(config_path);

        let mut config = SiteConfig::from_path(&config_path)?;
        config.apply_overrides(overrides);

        Self::from_config(root_path, config)
    }

    /// Loads the content of the site and checks it against `config`.
    ///
    /// Nothing is rendered unless the navigation, every page link and every
    /// `last_updated` date resolve, and no public file or theme stylesheet
    /// lands on a generated path.
    pub fn from_config(root_path: impl AsRef<Path>, config: SiteConfig) -> Result<Self, BuildError> {
        let root_path = root_path.as_ref().to_owned();
        let content_path = root_path.join(&config.src_dir);
        let public_path = content_path.join(&config.public_dir);

        tracing::info!("loading content from '{}'", content_path.display());
        let content = ContentStore::load(&content_path, Some(&public_path))?;
        tracing::info!("loaded {} pages", content.pages().len());

        let navigation = validate_site_config(&config, &content.page_paths())?;
        check_page_links(&content)?;

        let timezone = config
            .timezone
            .parse::<Tz>()
            .map_err(|_| BuildError::InvalidTimezone(config.timezone.clone()))?;

        for page in content.pages().values() {
            if let Some(date) = page.meta.last_updated.as_deref() {
                format_date(date, SITEMAP_DATE_FORMAT, timezone).map_err(|source| {
                    BuildError::InvalidDate {
                        path: page.file_path.clone(),
                        source,
                    }
                })?;
            }
        }

        let theme_path = config.theme_dir.as_ref().map(|theme_dir| root_path.join(theme_dir));
        check_output_paths(&content, &config, &public_path, theme_path.as_deref())?;

        Ok(Self {
            root_path,
            config,
            content,
            navigation,
            timezone,
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    pub fn navigation(&self) -> &Navigation {
        &self.navigation
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn content_path(&self) -> PathBuf {
        self.root_path.join(&self.config.src_dir)
    }

    pub fn public_path(&self) -> PathBuf {
        self.content_path().join(&self.config.public_dir)
    }

    pub fn theme_path(&self) -> Option<PathBuf> {
        self.config
            .theme_dir
            .as_ref()
            .map(|theme_dir| self.root_path.join(theme_dir))
    }

    pub fn output_path(&self) -> PathBuf {
        normalize_path(&self.root_path.join(&self.config.out_dir))
    }

    /// Builds the site into its output directory, replacing whatever was
    /// there before.
    pub fn build(&self) -> Result<PathBuf, BuildError> {
        let output_path = self.output_path();

        let resolved_output = resolve_path(&output_path);
        let contains_sources = [self.root_path.clone(), self.content_path()]
            .iter()
            .any(|source| resolve_path(source).starts_with(&resolved_output));
        if contains_sources {
            return Err(BuildError::UnsafeOutputDir(output_path));
        }

        if output_path.exists() {
            fs::remove_dir_all(&output_path).map_err(|source| BuildError::ClearOutput {
                path: output_path.clone(),
                source,
            })?;
        }

        tracing::info!("building site into '{}'", output_path.display());
        self.render_to(&DiskStorage::new(output_path.clone()), None)?;

        Ok(output_path)
    }

    /// Renders the whole site into `storage`.
    ///
    /// When `live_reload_port` is set, every page loads the live reload
    /// client.
    pub fn render_to(&self, storage: &impl Store, live_reload_port: Option<u16>) -> Result<(), RenderError> {
        let base = &self.navigation.base;

        self.copy_public_files(storage)?;

        let mut stylesheets = vec![compile_theme()?];
        if let Some(theme_path) = self.theme_path() {
            if theme_path.is_dir() {
                stylesheets.extend(compile_theme_dir(&theme_path)?);
            } else {
                tracing::warn!("theme directory '{}' does not exist", theme_path.display());
            }
        }

        let stylesheet_urls = stylesheets
            .iter()
            .map(|stylesheet| base.join(&stylesheet.path))
            .collect::<Vec<_>>();

        for stylesheet in stylesheets {
            storage
                .store_css(&stylesheet.path, stylesheet.css)
                .map_err(|err| RenderError::Storage(err.to_string()))?;
        }

        let ctx = RenderContext {
            config: &self.config,
            navigation: &self.navigation,
            stylesheets: &stylesheet_urls,
            live_reload_port,
        };

        let mut sitemap_entries = Vec::new();

        for page in self.content.pages().values() {
            tracing::debug!("rendering '{}'", page.path);

            let rendered = self.render_content_page(&ctx, page)?;

            storage
                .store_rendered_page(&page.path.output_path(), rendered)
                .map_err(|err| RenderError::Storage(err.to_string()))?;

            if let Some(hostname) = self.config.hostname.as_deref() {
                let updated_at = page
                    .meta
                    .last_updated
                    .as_deref()
                    .map(|date| self.format_page_date(page, date, SITEMAP_DATE_FORMAT))
                    .transpose()?;

                sitemap_entries.push(SitemapEntry::new(hostname, &page.path.url(base), updated_at)?);
            }
        }

        let not_found = not_found_content(base.as_str());
        let rendered = render_page(
            &ctx,
            &PageToRender {
                path: None,
                title: "Page not found",
                description: None,
                content: &not_found,
                table_of_contents: &Vec::new(),
                last_updated: None,
            },
        )?;
        storage
            .store_rendered_page(NOT_FOUND_PATH, rendered)
            .map_err(|err| RenderError::Storage(err.to_string()))?;

        if self.config.hostname.is_some() {
            storage
                .store_file(SITEMAP_PATH, render_sitemap(sitemap_entries)?.into_bytes())
                .map_err(|err| RenderError::Storage(err.to_string()))?;
        }

        tracing::info!("rendered {} pages", self.content.pages().len());

        Ok(())
    }

    fn render_content_page(&self, ctx: &RenderContext, page: &Page) -> Result<String, RenderError> {
        let base = &self.navigation.base;
        let dir = page.path.dir();

        let rewrite_link = |destination: &str| match resolve_link(destination, dir) {
            LinkTarget::Page { path, fragment } => {
                Some(with_fragment(path.url(base), fragment.as_deref()))
            }
            LinkTarget::Asset if destination.starts_with('/') && !destination.starts_with("//") => {
                Some(base.join(destination))
            }
            _ => None,
        };

        let markdown = render_markdown(&page.raw_content, &rewrite_link);

        let last_updated = page
            .meta
            .last_updated
            .as_deref()
            .map(|date| self.format_page_date(page, date, LAST_UPDATED_FORMAT))
            .transpose()?;

        Ok(render_page(
            ctx,
            &PageToRender {
                path: Some(&page.path),
                title: &page.title,
                description: page.meta.description.as_deref(),
                content: &markdown.html,
                table_of_contents: &markdown.table_of_contents,
                last_updated,
            },
        )?)
    }

    fn format_page_date(&self, page: &Page, date: &str, format: &str) -> Result<String, RenderError> {
        format_date(date, format, self.timezone).map_err(|source| RenderError::Date {
            path: page.file_path.clone(),
            source,
        })
    }

    fn copy_public_files(&self, storage: &impl Store) -> Result<(), RenderError> {
        let public_path = self.public_path();
        if !public_path.is_dir() {
            return Ok(());
        }

        for (file, relative) in public_files(&public_path)? {
            let contents = fs::read(&file).map_err(|source| RenderError::Io {
                path: file.clone(),
                source,
            })?;

            tracing::debug!("copying public file '{relative}'");

            storage
                .store_file(&relative, contents)
                .map_err(|err| RenderError::Storage(err.to_string()))?;
        }

        Ok(())
    }
}

/// Lists the files under `public_path` with their `/`-separated bundle paths.
fn public_files(public_path: &Path) -> Result<Vec<(PathBuf, String)>, walkdir::Error> {
    let mut files = Vec::new();

    for entry in WalkDir::new(public_path).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file = entry.path();
        let relative = file
            .strip_prefix(public_path)
            .unwrap_or(file)
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        files.push((file.to_owned(), relative));
    }

    Ok(files)
}

/// Fails when a public file or theme stylesheet would land on a path the
/// build writes itself.
fn check_output_paths(
    content: &ContentStore,
    config: &SiteConfig,
    public_path: &Path,
    theme_path: Option<&Path>,
) -> Result<(), BuildError> {
    let mut generated = content
        .pages()
        .keys()
        .map(|path| path.output_path())
        .collect::<BTreeSet<_>>();
    generated.extend([NOT_FOUND_PATH, THEME_CSS_PATH, LIVE_RELOAD_SCRIPT_PATH].map(String::from));
    if config.hostname.is_some() {
        generated.insert(SITEMAP_PATH.to_string());
    }

    if let Some(theme_path) = theme_path.filter(|theme_path| theme_path.is_dir()) {
        let sources = theme_dir_sources(theme_path).map_err(BuildError::Style)?;
        generated.extend(sources.into_iter().map(|(_, path)| path));
    }

    if !public_path.is_dir() {
        return Ok(());
    }

    for (file, path) in public_files(public_path).map_err(BuildError::Walk)? {
        if generated.contains(&path) {
            return Err(BuildError::OutputCollision { path, file });
        }
    }

    Ok(())
}

/// Resolves `.` and `..` components without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(component),
            },
            component => normalized.push(component),
        }
    }

    normalized
}

/// Resolves symlinks when `path` exists, falling back to [`normalize_path`].
fn resolve_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| normalize_path(path))
}
