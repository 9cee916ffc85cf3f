use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

const THEME_SCSS: &str = include_str!("../assets/theme.scss");

/// Output path of the built-in theme stylesheet.
pub const THEME_CSS_PATH: &str = "assets/style.css";

#[derive(Error, Debug)]
pub enum StyleError {
    #[error("failed to compile stylesheet '{}': {message}", path.display())]
    Sass { path: PathBuf, message: String },

    #[error("failed to walk theme directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("stylesheet '{}' would overwrite '{path}'", file.display())]
    Collision { path: String, file: PathBuf },
}

/// A compiled stylesheet and the path it is written to in the bundle.
#[derive(Debug, PartialEq, Eq)]
pub struct Stylesheet {
    pub path: String,
    pub css: String,
}

fn options() -> grass::Options<'static> {
    grass::Options::default().style(grass::OutputStyle::Compressed)
}

/// Compiles the built-in theme.
pub fn compile_theme() -> Result<Stylesheet, StyleError> {
    let css = grass::from_string(THEME_SCSS.to_owned(), &options()).map_err(|err| {
        StyleError::Sass {
            path: PathBuf::from("assets/theme.scss"),
            message: err.to_string(),
        }
    })?;

    Ok(Stylesheet {
        path: THEME_CSS_PATH.to_string(),
        css,
    })
}

/// Lists the stylesheets `theme_dir` compiles to, as `(source file, bundle
/// path)` pairs ordered by path. Partials (files starting with `_`) are
/// skipped.
///
/// Two sources may not compile to the same path, and none may replace the
/// built-in theme.
pub fn theme_dir_sources(theme_dir: &Path) -> Result<Vec<(PathBuf, String)>, StyleError> {
    fn is_sass(entry: &walkdir::DirEntry) -> bool {
        entry
            .path()
            .extension()
            .and_then(|extension| extension.to_str())
            .map(|extension| extension == "sass" || extension == "scss")
            .unwrap_or(false)
    }

    fn is_partial(entry: &walkdir::DirEntry) -> bool {
        entry
            .file_name()
            .to_str()
            .map(|filename| filename.starts_with('_'))
            .unwrap_or(false)
    }

    let mut sources: Vec<(PathBuf, String)> = Vec::new();

    for entry in WalkDir::new(theme_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_partial(entry))
    {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_sass(&entry) {
            continue;
        }

        let file = entry.path();
        let relative = file
            .strip_prefix(theme_dir)
            .unwrap_or(file)
            .with_extension("css");
        let relative = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let path = format!("assets/{relative}");

        if path == THEME_CSS_PATH || sources.iter().any(|(_, existing)| *existing == path) {
            return Err(StyleError::Collision {
                path,
                file: file.to_owned(),
            });
        }

        sources.push((file.to_owned(), path));
    }

    Ok(sources)
}

/// Compiles every stylesheet in `theme_dir`. Results are ordered by path.
pub fn compile_theme_dir(theme_dir: &Path) -> Result<Vec<Stylesheet>, StyleError> {
    theme_dir_sources(theme_dir)?
        .into_iter()
        .map(|(file, path)| -> Result<Stylesheet, StyleError> {
            let css = grass::from_path(&file, &options()).map_err(|err| StyleError::Sass {
                path: file,
                message: err.to_string(),
            })?;

            Ok(Stylesheet { path, css })
        })
        .collect()
}
