use std::str::FromStr;

use url::Url;

/// The absolute URL of a published page.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct Permalink(Url);

impl Permalink {
    /// Joins a root-relative URL path (including the base path) onto the
    /// site's hostname.
    pub fn from_path(hostname: &str, path: &str) -> Result<Self, url::ParseError> {
        let hostname = hostname.trim_end_matches('/');
        let path = path.trim_start_matches('/');

        Ok(Self(Url::from_str(&format!("{hostname}/{path}"))?))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_permalink() {
        assert_eq!(
            Permalink::from_path("https://example.github.io/", "/").unwrap(),
            Permalink("https://example.github.io/".parse().unwrap())
        );
        assert_eq!(
            Permalink::from_path("https://example.github.io", "/airbnb-clone/guide/02-project-setup.html")
                .unwrap()
                .as_str(),
            "https://example.github.io/airbnb-clone/guide/02-project-setup.html"
        );
    }

    #[test]
    fn test_invalid_hostname() {
        assert!(Permalink::from_path("not a host", "/").is_err());
    }
}
