//! The site configuration, read from `quire.toml`.
//!
//! ```toml
//! title = "Airbnb Clone with React"
//! base = "/airbnb-clone/"
//!
//! [[nav]]
//! text = "Guide"
//! link = "/guide/01-introduction"
//!
//! [[sidebar]]
//! text = "Getting Started"
//! items = [{ text = "Introduction", link = "/guide/01-introduction" }]
//!
//! [[social_links]]
//! icon = "github"
//! link = "https://github.com/example/airbnb-clone"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Configuration filename looked up in the project root.
pub const CONFIG_FILENAME: &str = "quire.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_base")]
    pub base: String,
    #[serde(default = "default_lang")]
    pub lang: String,
    /// The origin the site is published at (e.g. `https://example.github.io`).
    ///
    /// A `sitemap.xml` is only generated when this is set.
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default = "default_src_dir")]
    pub src_dir: PathBuf,
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    /// Directory copied verbatim into the output, relative to `src_dir`.
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
    /// Directory of additional `.scss`/`.sass` stylesheets.
    #[serde(default)]
    pub theme_dir: Option<PathBuf>,
    /// IANA time zone used to display `last_updated` dates.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub nav: Vec<NavEntry>,
    #[serde(default)]
    pub sidebar: Vec<SidebarGroup>,
    #[serde(default)]
    pub social_links: Vec<SocialLink>,
    #[serde(default)]
    pub server: ServerConfig,
}

/// A navigation link: a label and the page or URL it points at.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NavEntry {
    pub text: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SidebarGroup {
    pub text: String,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub items: Vec<NavEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocialLink {
    pub icon: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 5173,
        }
    }
}

fn default_base() -> String {
    "/".to_string()
}

fn default_lang() -> String {
    "en-US".to_string()
}

fn default_src_dir() -> PathBuf {
    PathBuf::from("docs")
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Values given on the command line that take precedence over `quire.toml`.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub base: Option<String>,
    pub out_dir: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl SiteConfig {
    /// Reads the configuration from the TOML file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;

        Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Applies command-line overrides. A base path given here is normalized
    /// first.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base) = overrides.base {
            self.base = crate::base_path::normalize_base_path(&base);
        }
        if let Some(out_dir) = overrides.out_dir {
            self.out_dir = out_dir;
        }
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = SiteConfig::parse(r#"title = "Docs""#).unwrap();

        assert_eq!(config.base, "/");
        assert_eq!(config.lang, "en-US");
        assert_eq!(config.src_dir, PathBuf::from("docs"));
        assert_eq!(config.out_dir, PathBuf::from("dist"));
        assert_eq!(config.public_dir, PathBuf::from("public"));
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.server, ServerConfig::default());
        assert!(config.nav.is_empty());
    }

    #[test]
    fn test_nav_order_is_preserved() {
        let config = SiteConfig::parse(indoc! {r#"
            title = "Airbnb Clone"
            base = "/airbnb-clone/"

            [[nav]]
            text = "Zebra"
            link = "/z"

            [[nav]]
            text = "Apple"
            link = "/a"

            [[sidebar]]
            text = "Basics"
            collapsed = true
            items = [
                { text = "Setup", link = "/guide/02-setup" },
                { text = "Intro", link = "/guide/01-introduction" },
            ]

            [[social_links]]
            icon = "github"
            link = "https://github.com/example/airbnb-clone"
        "#})
        .unwrap();

        assert_eq!(
            config
                .nav
                .iter()
                .map(|entry| entry.text.as_str())
                .collect::<Vec<_>>(),
            vec!["Zebra", "Apple"]
        );
        assert_eq!(config.sidebar[0].items[0].text, "Setup");
        assert!(config.sidebar[0].collapsed);
        assert_eq!(config.social_links[0].icon, "github");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(SiteConfig::parse("title = \"Docs\"\nbsae = \"/\"\n").is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = SiteConfig::parse(r#"title = "Docs""#).unwrap();

        config.apply_overrides(ConfigOverrides {
            base: Some("my-repo".to_string()),
            port: Some(8080),
            ..Default::default()
        });

        assert_eq!(config.base, "/my-repo/");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_missing_file() {
        let err = SiteConfig::from_path("does/not/exist/quire.toml").unwrap_err();

        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
