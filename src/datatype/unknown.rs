//! Fallback datatype for unregistered type ids.
//!
//! Constructing a value for a type id nobody registered is not a fault: the
//! container is backed by this datatype, which records a registry error the
//! moment a value is assigned. The raw input is kept so displays still show
//! what the user wrote.

use crate::{
    datatype::{Datatype, ParseCx},
    properties::Scalar,
};

#[derive(Debug, Default, Clone)]
pub struct UnknownValue {
    type_id: String,
    raw: Option<String>,
}

impl UnknownValue {
    pub fn new(type_id: impl Into<String>) -> Self {
        UnknownValue {
            type_id: type_id.into(),
            raw: None,
        }
    }
}

impl Datatype for UnknownValue {
    fn parse_user_value(&mut self, raw: &str, cx: &mut ParseCx<'_>) {
        self.raw = Some(raw.trim().to_string());
        cx.error("value-unknown-type", &[self.type_id.clone()]);
    }

    fn parse_db_keys(&mut self, keys: &[Scalar], cx: &mut ParseCx<'_>) {
        self.raw = keys.first().map(Scalar::render);
        cx.error("value-unknown-type", &[self.type_id.clone()]);
    }

    fn db_keys(&self) -> Vec<Scalar> {
        vec![Scalar::Text(self.raw.clone().unwrap_or_default())]
    }

    fn wiki_value(&self) -> Option<String> {
        None
    }

    fn display_label(&self, _output_format: Option<&str>) -> String {
        self.raw.clone().unwrap_or_default()
    }
}
