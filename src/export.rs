//! Export projection: the seam consumed by RDF/OWL style exporters.
//!
//! A valid value exports as an [`ExportData`] node; the default
//! representation is a single untyped literal built from the value's
//! key-vector, while datatypes with richer structure (notably page
//! references) emit resource nodes instead. Invalid values export nothing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Site-link markup `[[target|caption]]` / `[[target]]`, captured so the
/// visible text survives stripping.
static LINK_MARKUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[(?:[^\]|]*\|)?([^\]]*)\]\]").expect("static pattern"));

/// Inline HTML tags.
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("static pattern"));

/// Remove markup from a display string, keeping the human-visible text.
pub fn strip_markup(text: &str) -> String {
    let stripped = LINK_MARKUP_RE.replace_all(text, "$1");
    TAG_RE.replace_all(&stripped, "").into_owned()
}

/// One exportable node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportNode {
    /// A literal value, optionally tagged with a datatype identifier
    /// (e.g. an XSD type URI).
    Literal {
        value: String,
        datatype: Option<String>,
    },
    /// A reference to a resource rather than a literal.
    Resource { target: String, label: String },
}

/// Export form of one data value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportData {
    pub node: ExportNode,
}

impl ExportData {
    pub fn untyped_literal(value: impl Into<String>) -> Self {
        ExportData {
            node: ExportNode::Literal {
                value: value.into(),
                datatype: None,
            },
        }
    }

    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        ExportData {
            node: ExportNode::Literal {
                value: value.into(),
                datatype: Some(datatype.into()),
            },
        }
    }

    pub fn resource(target: impl Into<String>, label: impl Into<String>) -> Self {
        ExportData {
            node: ExportNode::Resource {
                target: target.into(),
                label: label.into(),
            },
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.node, ExportNode::Literal { .. })
    }

    pub fn is_resource(&self) -> bool {
        matches!(self.node, ExportNode::Resource { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_strip_markup_links() {
        assert_eq!(strip_markup("[[Help:Editing|editing]]"), "editing");
        assert_eq!(strip_markup("[[Editing]]"), "Editing");
        assert_eq!(strip_markup("plain"), "plain");
    }

    #[test]
    fn test_strip_markup_tags() {
        assert_eq!(strip_markup("5 <span class=\"unit\">km</span>"), "5 km");
    }

    #[test]
    fn test_export_node_kinds() {
        assert!(ExportData::untyped_literal("x").is_literal());
        assert!(ExportData::resource("Help:Editing", "Editing").is_resource());
    }
}
