use serde::{Deserialize, Serialize};
use thiserror::Error;
use toml::de::Error as TomlError;
use url::ParseError as UrlParseError;

/// Infrastructure-level errors raised by registry, template and configuration
/// machinery.
///
/// Note that failures to interpret a *value* are never expressed through this
/// type: the value container accumulates those as display strings and keeps
/// operating (see [`crate::value::TypedValue`]). `OnticError` is reserved for
/// faults in the machinery around values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum OnticError {
    #[error("Datatype registry error: {0}")]
    Registry(String),
    #[error("Service link template error: {0}")]
    Template(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Custom error: {0}")]
    Custom(String),
}

impl From<TomlError> for OnticError {
    fn from(error: TomlError) -> Self {
        OnticError::Serialization(format!("{error}"))
    }
}

impl From<toml::ser::Error> for OnticError {
    fn from(error: toml::ser::Error) -> Self {
        OnticError::Serialization(format!("{error}"))
    }
}

impl From<UrlParseError> for OnticError {
    fn from(error: UrlParseError) -> Self {
        OnticError::Template(format!("{error}"))
    }
}

impl From<regex::Error> for OnticError {
    fn from(error: regex::Error) -> Self {
        OnticError::Custom(format!("{error}"))
    }
}
