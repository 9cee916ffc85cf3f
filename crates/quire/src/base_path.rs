use std::fmt;

use thiserror::Error;

/// The root-relative path a site is served under (e.g. `/airbnb-clone/`).
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct BasePath(String);

#[derive(Error, Debug, PartialEq, Eq, Clone)]
#[error("invalid base path '{base}': {reason}")]
pub struct InvalidBasePath {
    pub base: String,
    pub reason: &'static str,
}

impl BasePath {
    /// Returns the root base path, `/`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Parses a base path exactly as written, without normalizing it.
    pub fn parse(base: &str) -> Result<Self, InvalidBasePath> {
        let invalid = |reason| InvalidBasePath {
            base: base.to_string(),
            reason,
        };

        if !base.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        if !base.ends_with('/') {
            return Err(invalid("must end with '/'"));
        }

        if base
            .chars()
            .any(|char| char.is_whitespace() || matches!(char, '?' | '#' | '\\'))
        {
            return Err(invalid("must not contain whitespace, '?', '#' or '\\'"));
        }

        if base == "/" {
            return Ok(Self::root());
        }

        for segment in base[1..base.len() - 1].split('/') {
            match segment {
                "" => return Err(invalid("must not contain empty segments")),
                "." | ".." => return Err(invalid("must not contain '.' or '..' segments")),
                _ => {}
            }
        }

        Ok(Self(base.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Joins a path relative to the site root onto this base path.
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path.trim_start_matches('/'))
    }
}

impl fmt::Display for BasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for BasePath {
    fn default() -> Self {
        Self::root()
    }
}

/// Normalizes user input into a root-relative path with a leading and
/// trailing slash.
///
/// Normalizing an already-normalized path returns it unchanged.
pub fn normalize_base_path(raw: &str) -> String {
    let segments = raw
        .trim()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}/", segments.join("/"))
}
