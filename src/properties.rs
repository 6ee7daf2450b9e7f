/// [crate::properties] contains the basic building blocks shared by the value
/// container and the datatype implementations: key-vector scalars, the weak
/// property back-reference, output modes and the reserved host markers.
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::error::OnticError;

/// Property id under which a property declares its enumerated allowed values.
pub const PROP_ALLOWED_VALUES: &str = "_PVAL";

/// Property id under which a property declares its service link names.
pub const PROP_SERVICE_LINKS: &str = "_SERV";

/// Property id under which a property declares its datatype.
pub const PROP_TYPE: &str = "_TYPE";

/// Control bytes used by host frameworks to mark embedded content they could
/// not parse (math, galleries, ...). Raw user input containing one of these is
/// rejected before any datatype parser runs, since the original input is no
/// longer recoverable at that point.
pub const RESERVED_MARKERS: [char; 2] = ['\x07', '\x7f'];

/// True if `raw` contains a reserved host control marker.
pub fn contains_reserved_marker(raw: &str) -> bool {
    raw.chars().any(|c| RESERVED_MARKERS.contains(&c))
}

/// A single entry of a normalized key-vector.
///
/// Key-vectors are ordered sequences of these primitive scalars, never nested
/// structures. They are the storage-ready form of a value: compact, cheap to
/// compare, and reproducible through
/// [`TypedValue::set_persisted_value`](crate::value::TypedValue::set_persisted_value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
}

impl Scalar {
    /// The storage/display rendition of the scalar. Integral floats render
    /// without a fractional part so that `Float(5000.0)` and `Int(5000)`
    /// produce the same hash component.
    pub fn render(&self) -> String {
        match self {
            Scalar::Text(text) => text.clone(),
            Scalar::Int(number) => format!("{number}"),
            Scalar::Float(number) => {
                if number.fract() == 0.0 && number.is_finite() && number.abs() < 1e15 {
                    format!("{}", *number as i64)
                } else {
                    format!("{number}")
                }
            }
        }
    }

    /// Interpret the scalar as a number, if possible. Text scalars are parsed
    /// so that key-vectors restored from lenient storage backends still
    /// round-trip.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Int(number) => Some(*number as f64),
            Scalar::Float(number) => Some(*number),
            Scalar::Text(text) => text.trim().parse::<f64>().ok(),
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl From<&str> for Scalar {
    fn from(text: &str) -> Self {
        Scalar::Text(text.to_string())
    }
}

impl From<String> for Scalar {
    fn from(text: String) -> Self {
        Scalar::Text(text)
    }
}

impl From<i64> for Scalar {
    fn from(number: i64) -> Self {
        Scalar::Int(number)
    }
}

impl From<u32> for Scalar {
    fn from(number: u32) -> Self {
        Scalar::Int(i64::from(number))
    }
}

impl From<f64> for Scalar {
    fn from(number: f64) -> Self {
        Scalar::Float(number)
    }
}

/// Weak back-reference from a value to the property it annotates.
///
/// The container never owns property state; it only carries the property's id
/// and display label in order to look up per-property constraints
/// ([`PROP_ALLOWED_VALUES`]) and service link definitions
/// ([`PROP_SERVICE_LINKS`]) through the injected store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyHandle {
    pub id: String,
    pub label: String,
}

impl PropertyHandle {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        PropertyHandle {
            id: id.into(),
            label: label.into(),
        }
    }
}

impl Display for PropertyHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Requested projection format for value and infolink rendering.
///
/// `File` has no rendering of its own and falls back to [`OutputMode::Html`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputMode {
    #[default]
    Markup,
    Html,
    File,
}

impl Display for OutputMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl TryFrom<&str> for OutputMode {
    type Error = OnticError;

    fn try_from(string: &str) -> Result<Self, Self::Error> {
        match &string.to_lowercase()[..] {
            "markup" | "wiki" => Ok(OutputMode::Markup),
            "html" => Ok(OutputMode::Html),
            "file" => Ok(OutputMode::File),
            _ => Err(OnticError::Custom(format!(
                "Unknown output mode '{string}'. Valid options: markup, html, file"
            ))),
        }
    }
}

/// Minimal HTML escaping for rich-markup projections.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_scalar_render_integral_float() {
        assert_eq!(Scalar::Float(5000.0).render(), "5000");
        assert_eq!(Scalar::Float(0.5).render(), "0.5");
        assert_eq!(Scalar::Int(12).render(), "12");
        assert_eq!(Scalar::Text("m".to_string()).render(), "m");
    }

    #[test]
    fn test_scalar_as_number() {
        assert_eq!(Scalar::Text(" 42 ".to_string()).as_number(), Some(42.0));
        assert_eq!(Scalar::Int(-3).as_number(), Some(-3.0));
        assert_eq!(Scalar::Text("km".to_string()).as_number(), None);
    }

    #[test]
    fn test_reserved_marker_detection() {
        assert!(contains_reserved_marker("foo\x7fbar"));
        assert!(contains_reserved_marker("\x07"));
        assert!(!contains_reserved_marker("plain text"));
    }

    #[test]
    fn test_output_mode_from_str() {
        assert_eq!(OutputMode::try_from("wiki").unwrap(), OutputMode::Markup);
        assert_eq!(OutputMode::try_from("HTML").unwrap(), OutputMode::Html);
        assert!(OutputMode::try_from("pdf").is_err());
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b> & \"c\""), "a&lt;b&gt; &amp; &quot;c&quot;");
    }
}
