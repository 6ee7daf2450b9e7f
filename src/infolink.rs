//! Auxiliary links attached to displayed values.
//!
//! Two kinds exist: the default "search for other values of this property"
//! link, and service links produced by substituting value parameters into a
//! host-configured message template. Templates render to one link per line in
//! `url|caption` form; malformed lines and invalid URLs are skipped rather
//! than failing the value.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::context::LinkRenderer;

/// Rendered service link templates separate entries with a line break,
/// optionally followed by one whitespace character of indentation.
static SERVICE_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s?").expect("static pattern"));

/// The destination of an [`Infolink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkTarget {
    /// Search for all entities carrying `value` for `property`.
    PropertySearch { property: String, value: String },
    /// An external service resource.
    External(Url),
}

/// One auxiliary link: a target plus the caption shown to the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Infolink {
    pub target: LinkTarget,
    pub caption: String,
}

impl Infolink {
    /// The default search link for a property/value pair. The conventional
    /// caption is "+", kept short because the link rides along every
    /// rendered value.
    pub fn property_search(property: impl Into<String>, value: impl Into<String>) -> Self {
        Infolink {
            target: LinkTarget::PropertySearch {
                property: property.into(),
                value: value.into(),
            },
            caption: "+".to_string(),
        }
    }

    pub fn external(url: Url, caption: impl Into<String>) -> Self {
        Infolink {
            target: LinkTarget::External(url),
            caption: caption.into(),
        }
    }

    pub fn markup(&self, renderer: &dyn LinkRenderer) -> String {
        renderer.markup(&self.target, &self.caption)
    }

    pub fn html(&self, renderer: &dyn LinkRenderer) -> String {
        renderer.html(&self.target, &self.caption)
    }
}

/// Split a resolved service link template into link entries.
///
/// Each non-empty line must contain `url|caption`; lines missing the pipe or
/// carrying an unparseable URL are dropped with a warning. Order is
/// preserved.
pub fn parse_service_links(rendered_template: &str) -> Vec<Infolink> {
    let mut links = Vec::new();
    for line in SERVICE_LINE_RE.split(rendered_template) {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let Some((url_part, caption)) = line.split_once('|') else {
            tracing::warn!(
                "[parse_service_links] Skipping service link line without caption: '{line}'"
            );
            continue;
        };
        match Url::parse(url_part.trim()) {
            Ok(url) => links.push(Infolink::external(url, caption.trim())),
            Err(error) => {
                tracing::warn!(
                    "[parse_service_links] Skipping service link with invalid url '{}': {error}",
                    url_part.trim()
                );
            }
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_parse_service_links_splits_lines() {
        let rendered = "https://example.org/a?q=5|Service A\n https://example.org/b|Service B";
        let links = parse_service_links(rendered);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].caption, "Service A");
        assert_eq!(links[1].caption, "Service B");
    }

    #[test]
    fn test_parse_service_links_skips_malformed() {
        let rendered = "no pipe here\nnot-a-url|Caption\nhttps://ok.example/|Good";
        let links = parse_service_links(rendered);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].caption, "Good");
    }

    #[test]
    fn test_missing_message_fallback_yields_no_links() {
        // A missing template resolves to ⧼key⧽, which carries no pipe.
        assert!(parse_service_links("⧼service_unknown⧽").is_empty());
    }
}
