use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

static TOML_REGEX: Lazy<Regex> = Lazy::new(|| {
    let pattern = r"^[[:space:]]*\+\+\+(\r?\n(?s).*?(?-s))\+\+\+[[:space:]]*(?:$|(?:\r?\n((?s).*(?-s))$))";
    Regex::new(pattern).expect("failed to compile regex for TOML front matter")
});

static YAML_REGEX: Lazy<Regex> = Lazy::new(|| {
    let pattern = r"^[[:space:]]*---(\r?\n(?s).*?(?-s))---[[:space:]]*(?:$|(?:\r?\n((?s).*(?-s))$))";
    Regex::new(pattern).expect("failed to compile regex for YAML front matter")
});

#[derive(Error, Debug, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct FrontMatterError {
    /// The 1-based line in the document the error points at.
    pub line: usize,
    pub message: String,
}

/// A document split into its front matter and its body.
#[derive(Debug)]
pub struct SplitDocument<'a, T> {
    pub front_matter: Option<T>,
    pub body: &'a str,
    /// The 1-based line in the document the body starts on.
    pub body_line: usize,
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Toml,
    Yaml,
}

/// Splits `text` into optional `+++` TOML or `---` YAML front matter and the
/// Markdown body.
pub fn parse_front_matter<T>(text: &str) -> Result<SplitDocument<'_, T>, FrontMatterError>
where
    T: serde::de::DeserializeOwned,
{
    let trimmed = text.trim_start();
    let (format, captures) = if trimmed.starts_with("+++") {
        (Format::Toml, TOML_REGEX.captures(text))
    } else if trimmed.starts_with("---") {
        (Format::Yaml, YAML_REGEX.captures(text))
    } else {
        return Ok(SplitDocument {
            front_matter: None,
            body: text,
            body_line: 1,
        });
    };

    let fence_line = line_at(text, text.len() - trimmed.len());

    let Some(captures) = captures else {
        return Err(FrontMatterError {
            line: fence_line,
            message: "front matter is not terminated".to_string(),
        });
    };

    let raw = captures.get(1).map_or("", |m| m.as_str());
    let front_matter = match format {
        Format::Toml => toml::from_str(raw).map_err(|err| FrontMatterError {
            line: fence_line + err.span().map_or(0, |span| count_lines(&raw[..span.start])),
            message: err.message().to_string(),
        })?,
        Format::Yaml => serde_yaml::from_str(raw).map_err(|err| FrontMatterError {
            line: fence_line + err.location().map_or(0, |location| location.line() - 1),
            message: err.to_string(),
        })?,
    };

    let (body, body_line) = body_of(text, &captures);

    Ok(SplitDocument {
        front_matter: Some(front_matter),
        body,
        body_line,
    })
}

fn body_of<'a>(text: &'a str, captures: &Captures<'a>) -> (&'a str, usize) {
    match captures.get(2) {
        Some(body) => (body.as_str(), line_at(text, body.start())),
        None => ("", line_at(text, text.len())),
    }
}

fn count_lines(text: &str) -> usize {
    text.bytes().filter(|byte| *byte == b'\n').count()
}

/// Returns the 1-based line of the byte at `offset`.
pub fn line_at(text: &str, offset: usize) -> usize {
    1 + count_lines(&text[..offset.min(text.len())])
}

pub fn from_toml_datetime<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DatetimeOrString {
        Datetime(toml::value::Datetime),
        String(String),
    }

    match DatetimeOrString::deserialize(deserializer)? {
        DatetimeOrString::Datetime(datetime) => Ok(Some(datetime.to_string())),
        DatetimeOrString::String(string) => match toml::value::Datetime::from_str(&string) {
            Ok(datetime) => Ok(Some(datetime.to_string())),
            Err(err) => Err(D::Error::custom(err)),
        },
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Meta {
        title: Option<String>,
    }

    #[test]
    fn test_no_front_matter() {
        let doc = parse_front_matter::<Meta>("# Hello\n\nWorld\n").unwrap();

        assert_eq!(doc.front_matter, None);
        assert_eq!(doc.body, "# Hello\n\nWorld\n");
        assert_eq!(doc.body_line, 1);
    }

    #[test]
    fn test_toml_front_matter() {
        let text = indoc! {r#"
            +++
            title = "Setting up"
            +++

            # Setup
        "#};

        let doc = parse_front_matter::<Meta>(text).unwrap();

        assert_eq!(
            doc.front_matter,
            Some(Meta {
                title: Some("Setting up".to_string())
            })
        );
        assert_eq!(doc.body.trim(), "# Setup");
    }

    #[test]
    fn test_yaml_front_matter() {
        let text = indoc! {"
            ---
            title: Fetching listings
            ---
            Body text.
        "};

        let doc = parse_front_matter::<Meta>(text).unwrap();

        assert_eq!(
            doc.front_matter,
            Some(Meta {
                title: Some("Fetching listings".to_string())
            })
        );
        assert_eq!(doc.body, "Body text.\n");
        assert_eq!(doc.body_line, 4);
    }

    #[test]
    fn test_malformed_toml_reports_line() {
        let text = indoc! {r#"
            +++
            title = "ok"
            date = = 3
            +++
        "#};

        let err = parse_front_matter::<Meta>(text).unwrap_err();

        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_malformed_yaml_reports_line() {
        let text = "---\ntitle: ok\nitems: [a, b\n---\n\nBody\n";

        let err = parse_front_matter::<Meta>(text).unwrap_err();

        assert!(err.line >= 3, "unexpected line {}", err.line);
    }

    #[test]
    fn test_unterminated_front_matter() {
        let err = parse_front_matter::<Meta>("\n+++\ntitle = \"x\"\n").unwrap_err();

        assert_eq!(
            err,
            FrontMatterError {
                line: 2,
                message: "front matter is not terminated".to_string(),
            }
        );
    }
}
