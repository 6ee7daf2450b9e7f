//! Plain text datatype: a single-scalar passthrough.

use crate::{
    datatype::{Datatype, ParseCx},
    properties::Scalar,
};

/// Holds one free-form string. The user syntax and the normalized form are
/// the same modulo surrounding whitespace, so parsing cannot fail; only a
/// persisted vector with no usable entry produces an error.
#[derive(Debug, Default, Clone)]
pub struct TextValue {
    text: Option<String>,
}

impl TextValue {
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

impl Datatype for TextValue {
    fn parse_user_value(&mut self, raw: &str, cx: &mut ParseCx<'_>) {
        let trimmed = raw.trim();
        cx.propose_caption(trimmed);
        self.text = Some(trimmed.to_string());
    }

    fn parse_db_keys(&mut self, keys: &[Scalar], cx: &mut ParseCx<'_>) {
        match keys.first() {
            Some(scalar) => self.text = Some(scalar.render()),
            None => cx.error("value-malformed-keys", &[]),
        }
    }

    fn db_keys(&self) -> Vec<Scalar> {
        vec![Scalar::Text(self.text.clone().unwrap_or_default())]
    }

    fn wiki_value(&self) -> Option<String> {
        self.text.clone()
    }

    fn service_link_params(&self) -> Option<Vec<String>> {
        self.text.clone().map(|text| vec![text])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DefaultMessages;
    use test_log::test;

    fn parse(raw: &str) -> (TextValue, Vec<String>) {
        let mut value = TextValue::default();
        let mut errors = Vec::new();
        let mut caption = None;
        let messages = DefaultMessages::create();
        let mut cx = ParseCx {
            errors: &mut errors,
            caption: &mut caption,
            output_format: None,
            messages: &messages,
        };
        value.parse_user_value(raw, &mut cx);
        (value, errors)
    }

    #[test]
    fn test_text_trims_and_roundtrips() {
        let (value, errors) = parse("  hello world  ");
        assert!(errors.is_empty());
        assert_eq!(value.wiki_value().as_deref(), Some("hello world"));
        assert_eq!(value.db_keys(), vec![Scalar::Text("hello world".into())]);
    }

    #[test]
    fn test_text_from_db_keys_tolerates_numbers() {
        let mut value = TextValue::default();
        let mut errors = Vec::new();
        let mut caption = None;
        let messages = DefaultMessages::create();
        let mut cx = ParseCx {
            errors: &mut errors,
            caption: &mut caption,
            output_format: None,
            messages: &messages,
        };
        value.parse_db_keys(&[Scalar::Int(7)], &mut cx);
        assert!(errors.is_empty());
        assert_eq!(value.text(), Some("7"));
    }
}
