//! Publishes a built bundle into a target directory, such as the working tree
//! of a `gh-pages` branch.
//!
//! The bundle is copied into a staging directory next to the target and then
//! swapped into place, so the target either holds the previous publish or the
//! new one in full.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

/// Marker telling GitHub Pages not to run the bundle through Jekyll.
pub const NO_JEKYLL: &str = ".nojekyll";

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("bundle '{}' does not exist; build the site first", .0.display())]
    MissingBundle(PathBuf),

    #[error("cannot publish '{}' into '{}': the directories overlap", bundle.display(), target.display())]
    Overlapping { bundle: PathBuf, target: PathBuf },

    #[error("invalid publish target '{}'", .0.display())]
    InvalidTarget(PathBuf),

    #[error("failed to publish to '{}': {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to walk bundle: {0}")]
    Walk(#[from] walkdir::Error),
}

/// The outcome of a successful publish.
#[derive(Debug, PartialEq, Eq)]
pub struct PublishReport {
    pub target: PathBuf,
    /// Number of files copied from the bundle.
    pub files: usize,
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> PublishError + '_ {
    move |source| PublishError::Io {
        path: path.to_owned(),
        source,
    }
}

/// Publishes the bundle in `bundle_path` to `target_path`.
///
/// Publishing the same bundle twice leaves the target with the same contents.
/// On failure the previous contents of the target are restored and the bundle
/// is left untouched.
pub fn publish(bundle_path: &Path, target_path: &Path) -> Result<PublishReport, PublishError> {
    if !bundle_path.is_dir() {
        return Err(PublishError::MissingBundle(bundle_path.to_owned()));
    }

    let bundle_path = bundle_path.canonicalize().map_err(io_error(bundle_path))?;

    let target_name = target_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| PublishError::InvalidTarget(target_path.to_owned()))?;
    let parent = match target_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_owned(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(io_error(&parent))?;
    let parent = parent.canonicalize().map_err(io_error(&parent))?;
    let target_path = parent.join(target_name);

    if target_path.starts_with(&bundle_path) || bundle_path.starts_with(&target_path) {
        return Err(PublishError::Overlapping {
            bundle: bundle_path,
            target: target_path,
        });
    }

    let staging_path = parent.join(format!(".{target_name}.staging"));
    let backup_path = parent.join(format!(".{target_name}.previous"));

    remove_dir_if_exists(&staging_path)?;
    remove_dir_if_exists(&backup_path)?;

    tracing::info!(
        "staging '{}' in '{}'",
        bundle_path.display(),
        staging_path.display()
    );

    let files = match stage(&bundle_path, &staging_path) {
        Ok(files) => files,
        Err(err) => {
            discard(&staging_path);
            return Err(err);
        }
    };

    let had_target = target_path.exists();
    if had_target {
        if let Err(source) = fs::rename(&target_path, &backup_path) {
            discard(&staging_path);
            return Err(PublishError::Io {
                path: target_path,
                source,
            });
        }
    }

    if let Err(source) = fs::rename(&staging_path, &target_path) {
        if had_target {
            if let Err(err) = fs::rename(&backup_path, &target_path) {
                tracing::error!(
                    "failed to restore '{}' from '{}': {err}",
                    target_path.display(),
                    backup_path.display()
                );
            }
        }
        discard(&staging_path);

        return Err(PublishError::Io {
            path: target_path,
            source,
        });
    }

    if had_target {
        if let Err(err) = fs::remove_dir_all(&backup_path) {
            tracing::warn!(
                "failed to remove previous publish '{}': {err}",
                backup_path.display()
            );
        }
    }

    tracing::info!("published {files} files to '{}'", target_path.display());

    Ok(PublishReport {
        target: target_path,
        files,
    })
}

/// Copies the bundle into `staging_path` and adds the `.nojekyll` marker.
fn stage(bundle_path: &Path, staging_path: &Path) -> Result<usize, PublishError> {
    let mut files = 0;

    for entry in WalkDir::new(bundle_path).sort_by_file_name() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(bundle_path).unwrap_or(entry.path());
        let destination = staging_path.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination).map_err(io_error(&destination))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &destination).map_err(io_error(&destination))?;
            files += 1;
        }
    }

    let no_jekyll = staging_path.join(NO_JEKYLL);
    fs::write(&no_jekyll, "").map_err(io_error(&no_jekyll))?;

    Ok(files)
}

fn remove_dir_if_exists(path: &Path) -> Result<(), PublishError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PublishError::Io {
            path: path.to_owned(),
            source,
        }),
    }
}

fn discard(path: &Path) {
    if let Err(err) = remove_dir_if_exists(path) {
        tracing::warn!("{err}");
    }
}
