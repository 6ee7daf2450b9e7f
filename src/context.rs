//! Injected collaborator seams for the value model.
//!
//! The container deliberately does not know how property metadata is stored,
//! how messages are localized, or how links are rendered by the host. Those
//! three concerns enter through the traits in this module, bundled into a
//! [`ValueContext`] that is shared (via `Arc`) by every container a
//! [`ValueFactory`](crate::datatype::ValueFactory) constructs.
//!
//! Every trait here is failure-free by contract: a collaborator that cannot
//! answer returns an empty result or a deterministic fallback string. Value
//! parsing never faults because a lookup went wrong.

use std::{collections::HashMap, sync::Arc};

use crate::{
    datatype::DatatypeRegistry,
    infolink::LinkTarget,
    properties::escape_html,
};

/// Read access to per-property metadata values.
///
/// `property_values` returns the raw value strings recorded for
/// `property_id` on the given entity, in declaration order. Implementations
/// must return an empty vector when nothing is found or the backend fails;
/// they must never panic or block indefinitely.
pub trait PropertyStore: Send + Sync {
    fn property_values(
        &self,
        entity: &crate::properties::PropertyHandle,
        property_id: &str,
    ) -> Vec<String>;
}

/// Localized message resolution with positional substitution.
///
/// Templates reference arguments as `$1`, `$2`, ... A missing key must
/// resolve to a deterministic fallback so that error strings remain stable
/// across hosts; the convention used by [`DefaultMessages`] is `⧼key⧽`.
pub trait MessageLookup: Send + Sync {
    fn resolve(&self, key: &str, args: &[String]) -> String;
}

/// Capability to render a link target plus caption in either projection.
pub trait LinkRenderer: Send + Sync {
    fn markup(&self, target: &LinkTarget, caption: &str) -> String;
    fn html(&self, target: &LinkTarget, caption: &str) -> String;
}

/// A store with no recorded properties. Used when containers operate without
/// a host: constraint checks and service links simply find nothing.
#[derive(Debug, Default, Clone)]
pub struct NullStore;

impl PropertyStore for NullStore {
    fn property_values(
        &self,
        _entity: &crate::properties::PropertyHandle,
        _property_id: &str,
    ) -> Vec<String> {
        Vec::new()
    }
}

/// In-memory message table with the built-in English defaults for the keys
/// the container itself emits. Hosts extend or replace it via
/// [`DefaultMessages::insert`] or their own [`MessageLookup`] implementation.
#[derive(Debug, Default, Clone)]
pub struct DefaultMessages {
    table: HashMap<String, String>,
}

impl DefaultMessages {
    /// Table preloaded with the messages the value model emits on its own.
    pub fn create() -> Self {
        let mut messages = DefaultMessages::default();
        messages.insert("value-parse-error", "The value could not be interpreted.");
        messages.insert(
            "value-not-in-enum",
            "\"$1\" is not in the list of allowed values ($2).",
        );
        messages.insert("value-error-tooltip", " (⚠ $1)");
        messages.insert(
            "value-unknown-type",
            "No datatype registered for type id \"$1\".",
        );
        messages.insert(
            "value-malformed-keys",
            "The stored form of this value is incomplete or malformed.",
        );
        messages.insert("value-bad-number", "\"$1\" is not a number.");
        messages.insert("value-bad-unit", "\"$1\" is not a known unit here.");
        messages.insert("value-empty", "No value was given.");
        messages
    }

    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.table.insert(key.into(), template.into());
    }
}

/// Substitute `$1`..`$n` in descending index order so that `$12` is not
/// clobbered by a `$1` replacement.
fn substitute(template: &str, args: &[String]) -> String {
    let mut text = template.to_string();
    for (index, arg) in args.iter().enumerate().rev() {
        text = text.replace(&format!("${}", index + 1), arg);
    }
    text
}

impl MessageLookup for DefaultMessages {
    fn resolve(&self, key: &str, args: &[String]) -> String {
        match self.table.get(key) {
            Some(template) => substitute(template, args),
            None => {
                tracing::debug!("[DefaultMessages::resolve] No entry for key '{key}'");
                format!("⧼{key}⧽")
            }
        }
    }
}

/// Host-agnostic link rendering: `[[target|caption]]`-style markup and plain
/// anchors for HTML. Hosts with their own link syntax inject a renderer of
/// their own.
#[derive(Debug, Default, Clone)]
pub struct PlainLinkRenderer;

impl LinkRenderer for PlainLinkRenderer {
    fn markup(&self, target: &LinkTarget, caption: &str) -> String {
        match target {
            LinkTarget::PropertySearch { property, value } => {
                format!("[[search:{property}/{value}|{caption}]]")
            }
            LinkTarget::External(url) => format!("[{url} {caption}]"),
        }
    }

    fn html(&self, target: &LinkTarget, caption: &str) -> String {
        let caption = escape_html(caption);
        match target {
            LinkTarget::PropertySearch { property, value } => format!(
                "<a href=\"search:{}/{}\">{caption}</a>",
                escape_html(property),
                escape_html(value)
            ),
            LinkTarget::External(url) => format!("<a href=\"{url}\">{caption}</a>"),
        }
    }
}

/// The bundle of collaborators handed to every container.
///
/// Cloning is cheap (`Arc`s throughout). The registry lives here as well so
/// that validation code can construct throwaway same-type containers without
/// reaching for ambient global state.
#[derive(Clone)]
pub struct ValueContext {
    pub registry: DatatypeRegistry,
    pub store: Arc<dyn PropertyStore>,
    pub messages: Arc<dyn MessageLookup>,
    pub linker: Arc<dyn LinkRenderer>,
}

impl Default for ValueContext {
    fn default() -> Self {
        ValueContext {
            registry: DatatypeRegistry::create(),
            store: Arc::new(NullStore),
            messages: Arc::new(DefaultMessages::create()),
            linker: Arc::new(PlainLinkRenderer),
        }
    }
}

impl ValueContext {
    pub fn with_store(mut self, store: Arc<dyn PropertyStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_messages(mut self, messages: Arc<dyn MessageLookup>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_linker(mut self, linker: Arc<dyn LinkRenderer>) -> Self {
        self.linker = linker;
        self
    }
}

impl std::fmt::Debug for ValueContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueContext")
            .field("registry", &self.registry.type_ids())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_substitution_order() {
        let mut messages = DefaultMessages::default();
        messages.insert("multi", "$2 then $1");
        assert_eq!(
            messages.resolve("multi", &["one".to_string(), "two".to_string()]),
            "two then one"
        );
    }

    #[test]
    fn test_missing_key_fallback_is_deterministic() {
        let messages = DefaultMessages::default();
        assert_eq!(messages.resolve("no-such-key", &[]), "⧼no-such-key⧽");
        assert_eq!(messages.resolve("no-such-key", &[]), "⧼no-such-key⧽");
    }

    #[test]
    fn test_plain_renderer_escapes_html() {
        let renderer = PlainLinkRenderer;
        let target = LinkTarget::PropertySearch {
            property: "Has <tag>".to_string(),
            value: "x".to_string(),
        };
        let html = renderer.html(&target, "a & b");
        assert!(html.contains("Has &lt;tag&gt;"));
        assert!(html.contains("a &amp; b"));
    }
}
