//! Per-view configuration read from YAML front matter.

use serde::{Deserialize, Serialize};
use trellis_core::ContentType;

/// View configuration extracted from front matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfig {
    /// Content category the view produces.
    #[serde(default)]
    pub content_type: ContentType,

    /// Output charset.
    #[serde(default = "default_charset")]
    pub charset: String,
}

fn default_charset() -> String {
    "UTF-8".to_string()
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            content_type: ContentType::Html,
            charset: default_charset(),
        }
    }
}

/// View source split into its configuration and template body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedView {
    /// Configuration from front matter.
    pub config: ViewConfig,

    /// Template body.
    pub body: String,

    /// Number of source lines preceding the body.
    pub line_offset: usize,
}

impl ParsedView {
    /// Parse a view with optional front matter.
    ///
    /// Front matter is delimited by `---` lines at the very start.
    ///
    /// # Errors
    ///
    /// Returns an error if the front matter is not valid YAML.
    pub fn parse(source: &str) -> Result<Self, serde_yaml::Error> {
        let lines: Vec<&str> = source.lines().collect();

        if lines.first().is_none_or(|l| l.trim() != "---") {
            return Ok(Self::plain(source));
        }

        let Some(end_idx) = lines
            .iter()
            .skip(1)
            .position(|l| l.trim() == "---")
            .map(|i| i + 1)
        else {
            return Ok(Self::plain(source));
        };

        let front_matter = lines[1..end_idx].join("\n");
        let config = if front_matter.trim().is_empty() {
            ViewConfig::default()
        } else {
            serde_yaml::from_str(&front_matter)?
        };

        Ok(Self {
            config,
            body: lines[end_idx + 1..].join("\n"),
            line_offset: end_idx + 1,
        })
    }

    fn plain(source: &str) -> Self {
        Self {
            config: ViewConfig::default(),
            body: source.to_string(),
            line_offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_without_front_matter() {
        let view = ParsedView::parse("{{ N.context_path }}").unwrap();
        assert_eq!(view.config, ViewConfig::default());
        assert_eq!(view.body, "{{ N.context_path }}");
        assert_eq!(view.line_offset, 0);
    }

    #[test]
    fn test_parse_raw_front_matter() {
        let view = ParsedView::parse("---\ncontentType: raw\n---\nid,name\n1,{{ name }}").unwrap();
        assert_eq!(view.config.content_type, ContentType::Raw);
        assert_eq!(view.config.charset, "UTF-8");
        assert_eq!(view.body, "id,name\n1,{{ name }}");
        assert_eq!(view.line_offset, 3);
    }

    #[test]
    fn test_empty_front_matter_uses_defaults() {
        let view = ParsedView::parse("---\n---\nHello").unwrap();
        assert_eq!(view.config.content_type, ContentType::Html);
        assert_eq!(view.body, "Hello");
    }

    #[test]
    fn test_invalid_front_matter() {
        assert!(ParsedView::parse("---\ncontentType: [\n---\nbody").is_err());
    }
}
