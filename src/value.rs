//! The value container: one [`TypedValue`] holds everything known about a
//! single property value of a declared type.
//!
//! ## Lifecycle
//!
//! A container is created empty with only its type id fixed, then populated
//! through exactly one of two entry paths:
//!
//! - [`TypedValue::set_user_value`] - a raw user-syntax string, parsed
//!   eagerly (the caller already holds the string, and parsing is cheap)
//! - [`TypedValue::set_persisted_value`] - a stored key-vector, kept as a
//!   stub and parsed lazily on the first read that needs normalized data
//!
//! Every read accessor triggers normalization, so the distinction is
//! invisible to callers. Normalization mutates the container, which is why
//! the read accessors take `&mut self`; for shared read-only access across
//! threads, call any read accessor once before handing out references. The stub payload is cleared *before* the datatype
//! parser runs: a parser that (directly or indirectly) re-reads the container
//! mid-parse sees no pending payload instead of recursing.
//!
//! ## Error discipline
//!
//! Nothing in this module returns `Err` or panics on bad input. Parse
//! failures, malformed persisted vectors and constraint violations accumulate
//! as display strings in the container; [`TypedValue::is_valid`] is the
//! single source of truth for whether the value succeeded. One bad value
//! degrades that one container only.

use std::{mem, sync::Arc};

use crate::{
    context::ValueContext,
    datatype::{Datatype, ParseCx, ValueFactory},
    export::{strip_markup, ExportData},
    infolink::{parse_service_links, Infolink},
    properties::{
        contains_reserved_marker, escape_html, OutputMode, PropertyHandle, Scalar,
        PROP_ALLOWED_VALUES, PROP_SERVICE_LINKS,
    },
};

/// Normalization state of a container.
#[derive(Debug)]
enum Lifecycle {
    /// No value assigned yet.
    Empty,
    /// A persisted key-vector awaiting lazy normalization.
    Pending(Vec<Scalar>),
    /// The datatype parser has run (successfully or not).
    Normalized,
}

/// One concrete value of one declared type.
pub struct TypedValue {
    type_id: String,
    datatype: Box<dyn Datatype + Send>,
    ctx: Arc<ValueContext>,
    /// Weak back-reference; used only for constraint and service link
    /// lookups.
    property: Option<PropertyHandle>,
    caption: Option<String>,
    /// The raw user input, kept as the display fallback when parsing fails.
    user_input: Option<String>,
    errors: Vec<String>,
    is_set: bool,
    output_format: Option<String>,
    infolinks: Vec<Infolink>,
    has_search_link: bool,
    has_service_links: bool,
    state: Lifecycle,
}

impl std::fmt::Debug for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedValue")
            .field("type_id", &self.type_id)
            .field("property", &self.property)
            .field("caption", &self.caption)
            .field("errors", &self.errors)
            .field("is_set", &self.is_set)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl TypedValue {
    /// Create an empty container. Callers normally go through
    /// [`ValueFactory::new_value`](crate::datatype::ValueFactory::new_value)
    /// instead.
    pub fn new(
        type_id: impl Into<String>,
        datatype: Box<dyn Datatype + Send>,
        ctx: Arc<ValueContext>,
    ) -> Self {
        TypedValue {
            type_id: type_id.into(),
            datatype,
            ctx,
            property: None,
            caption: None,
            user_input: None,
            errors: Vec::new(),
            is_set: false,
            output_format: None,
            infolinks: Vec::new(),
            has_search_link: false,
            has_service_links: false,
            state: Lifecycle::Empty,
        }
    }

    /// Drop everything derived from a previous assignment. Each entry path
    /// calls this first, so at most one assignment is ever pending.
    fn clear_derived(&mut self) {
        self.errors.clear();
        self.user_input = None;
        self.infolinks.clear();
        self.has_search_link = false;
        self.has_service_links = false;
        self.is_set = false;
        self.state = Lifecycle::Empty;
    }

    /// Assign a raw user-syntax value, with an optional display caption.
    ///
    /// Never faults: input containing a reserved host control marker is
    /// rejected with a single parse error before the datatype parser runs,
    /// and parser failures accumulate as errors. When parsing succeeds and a
    /// property is bound, the allowed-value constraint is enforced.
    pub fn set_user_value(&mut self, raw: &str, caption: Option<&str>) {
        self.clear_derived();
        self.caption = caption.map(|c| c.trim().to_string());
        self.user_input = Some(raw.trim().to_string());
        if contains_reserved_marker(raw) {
            // Host frameworks use these bytes to flag embedded content they
            // could not parse; the original input is unrecoverable here.
            let text = self.ctx.messages.resolve("value-parse-error", &[]);
            self.errors.push(text);
            self.state = Lifecycle::Normalized;
            return;
        }
        tracing::trace!(
            "[TypedValue::set_user_value] type '{}', raw '{raw}'",
            self.type_id
        );
        let messages = self.ctx.messages.clone();
        let mut cx = ParseCx {
            errors: &mut self.errors,
            caption: &mut self.caption,
            output_format: self.output_format.as_deref(),
            messages: &*messages,
        };
        self.datatype.parse_user_value(raw, &mut cx);
        self.is_set = true;
        self.state = Lifecycle::Normalized;
        if self.errors.is_empty() {
            self.check_allowed_values();
        }
    }

    /// Assign a persisted key-vector. The vector is stored as a stub and
    /// parsed lazily on the first read accessor; see the module docs.
    pub fn set_persisted_value(&mut self, keys: Vec<Scalar>) {
        self.clear_derived();
        self.caption = None;
        self.state = Lifecycle::Pending(keys);
        self.is_set = true;
    }

    /// Consume a pending stub, if any. Idempotent; the second call is a
    /// no-op.
    fn ensure_normalized(&mut self) {
        if !matches!(self.state, Lifecycle::Pending(_)) {
            return;
        }
        // The payload is moved out before the parser runs, so reentrant
        // reads during parsing find the container already normalized.
        match mem::replace(&mut self.state, Lifecycle::Normalized) {
            Lifecycle::Pending(keys) => {
                tracing::trace!(
                    "[TypedValue::ensure_normalized] type '{}', {} key(s)",
                    self.type_id,
                    keys.len()
                );
                let messages = self.ctx.messages.clone();
                let mut cx = ParseCx {
                    errors: &mut self.errors,
                    caption: &mut self.caption,
                    output_format: self.output_format.as_deref(),
                    messages: &*messages,
                };
                if keys.is_empty() {
                    cx.error("value-malformed-keys", &[]);
                } else {
                    self.datatype.parse_db_keys(&keys, &mut cx);
                }
            }
            other => self.state = other,
        }
    }

    /// Enforce the property's enumerated allowed values, if it declares any.
    ///
    /// Each allowed string is re-parsed into a throwaway container of the
    /// same type and compared by hash. Allowed strings that fail to parse
    /// are dropped from the candidate set. No caching: the list is expected
    /// to be short and this is not a hot path.
    fn check_allowed_values(&mut self) {
        let Some(property) = self.property.clone() else {
            return;
        };
        let allowed = self
            .ctx
            .store
            .property_values(&property, PROP_ALLOWED_VALUES);
        if allowed.is_empty() {
            return;
        }
        let own_hash = self.hash();
        let factory = ValueFactory::new(self.ctx.clone());
        let mut listing = Vec::new();
        for raw in &allowed {
            let mut candidate = factory.new_value(&self.type_id);
            candidate.set_user_value(raw, None);
            if !candidate.is_valid() {
                tracing::debug!(
                    "[TypedValue::check_allowed_values] Allowed value '{raw}' for property \
                     '{}' does not parse, dropping it from the candidate set",
                    property.id
                );
                continue;
            }
            if candidate.hash() == own_hash {
                return;
            }
            listing.push(candidate.short_markup());
        }
        let wiki = self.wiki_value().unwrap_or_default();
        let text = self
            .ctx
            .messages
            .resolve("value-not-in-enum", &[wiki, listing.join(", ")]);
        self.errors.push(text);
    }

    /// Bind the property this value annotates. Enables constraint checks and
    /// infolink generation.
    pub fn set_property(&mut self, property: PropertyHandle) {
        self.property = Some(property);
    }

    /// Override the display caption.
    pub fn set_caption(&mut self, caption: impl Into<String>) {
        self.caption = Some(caption.into());
    }

    /// Set the free-form output format hint a datatype may interpret (e.g. a
    /// desired display unit). The empty string resets to the default.
    pub fn set_output_format(&mut self, format: &str) {
        self.output_format = if format.is_empty() {
            None
        } else {
            Some(format.to_string())
        };
    }

    /// Record an additional error against this value.
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Attach a caller-supplied infolink.
    pub fn add_infolink(&mut self, link: Infolink) {
        self.infolinks.push(link);
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn property(&self) -> Option<&PropertyHandle> {
        self.property.as_ref()
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    /// True iff a value was assigned and no error accumulated.
    pub fn is_valid(&mut self) -> bool {
        self.ensure_normalized();
        self.errors.is_empty() && self.is_set
    }

    pub fn errors(&mut self) -> &[String] {
        self.ensure_normalized();
        &self.errors
    }

    /// All errors rendered as a single tooltip string, or empty when the
    /// value is error-free.
    pub fn error_text(&mut self) -> String {
        self.ensure_normalized();
        if self.errors.is_empty() {
            String::new()
        } else {
            self.ctx
                .messages
                .resolve("value-error-tooltip", &[self.errors.join(", ")])
        }
    }

    /// Canonical equality key: the key-vector joined with `\t` when valid,
    /// the error list joined the same way when not. Two containers of the
    /// same type id with equal hashes are semantically equal regardless of
    /// caption.
    pub fn hash(&mut self) -> String {
        if self.is_valid() {
            self.db_keys()
                .iter()
                .map(Scalar::render)
                .collect::<Vec<_>>()
                .join("\t")
        } else {
            self.errors.join("\t")
        }
    }

    /// The normalized key-vector. Always has at least one entry.
    pub fn db_keys(&mut self) -> Vec<Scalar> {
        self.ensure_normalized();
        let keys = self.datatype.db_keys();
        if keys.is_empty() {
            vec![Scalar::Text(String::new())]
        } else {
            keys
        }
    }

    /// The round-trippable user-syntax form of the value, or `None` when no
    /// such form is available (unset or unparseable values).
    pub fn wiki_value(&mut self) -> Option<String> {
        self.ensure_normalized();
        self.datatype.wiki_value()
    }

    /// Approximate numeric ordering key, when the datatype provides one.
    pub fn numeric_value(&mut self) -> Option<f64> {
        self.ensure_normalized();
        self.datatype.numeric_value()
    }

    pub fn is_numeric(&self) -> bool {
        self.datatype.is_numeric()
    }

    fn short_label(&mut self) -> String {
        self.ensure_normalized();
        if let Some(caption) = &self.caption {
            return caption.clone();
        }
        let label = self.datatype.display_label(self.output_format.as_deref());
        if label.is_empty() {
            // Unparseable user input still shows what was written.
            self.user_input.clone().unwrap_or_default()
        } else {
            label
        }
    }

    /// Short plain-markup projection: the caption/original string, plus an
    /// error tooltip when invalid.
    pub fn short_markup(&mut self) -> String {
        let label = self.short_label();
        let tooltip = self.error_text();
        format!("{label}{tooltip}")
    }

    /// Short rich-markup (HTML) projection.
    pub fn short_html(&mut self) -> String {
        let label = escape_html(&self.short_label());
        let tooltip = escape_html(&self.error_text());
        format!("{label}{tooltip}")
    }

    /// Long plain-markup projection: the fuller descriptive form, or the
    /// error text when invalid.
    pub fn long_markup(&mut self) -> String {
        self.ensure_normalized();
        if !self.errors.is_empty() {
            return self.errors.join(", ");
        }
        self.datatype.long_label(self.output_format.as_deref())
    }

    /// Long rich-markup (HTML) projection.
    pub fn long_html(&mut self) -> String {
        escape_html(&self.long_markup())
    }

    /// Dispatch to one of the short projections. `File` has no rendering of
    /// its own and uses the rich form.
    pub fn short_text(&mut self, mode: OutputMode) -> String {
        match mode {
            OutputMode::Markup => self.short_markup(),
            OutputMode::Html | OutputMode::File => self.short_html(),
        }
    }

    /// Dispatch to one of the long projections.
    pub fn long_text(&mut self, mode: OutputMode) -> String {
        match mode {
            OutputMode::Markup => self.long_markup(),
            OutputMode::Html | OutputMode::File => self.long_html(),
        }
    }

    /// The auxiliary links for this value: the default property-search link
    /// plus any configured service links. Populated at most once per
    /// container lifetime; only meaningful for valid, property-bound values.
    pub fn infolinks(&mut self) -> &[Infolink] {
        if self.is_valid() && self.property.is_some() {
            if !self.has_search_link {
                self.has_search_link = true;
                let label = self
                    .property
                    .as_ref()
                    .map(|p| p.label.clone())
                    .unwrap_or_default();
                let value = self.wiki_value().unwrap_or_default();
                self.infolinks.push(Infolink::property_search(label, value));
            }
            if !self.has_service_links {
                self.add_service_links();
            }
        }
        &self.infolinks
    }

    /// Build service links from the property's configured templates. The
    /// datatype supplies positional parameters; datatypes without service
    /// link support skip the whole step.
    fn add_service_links(&mut self) {
        if self.has_service_links {
            return;
        }
        let Some(property) = self.property.clone() else {
            return;
        };
        let Some(params) = self.datatype.service_link_params() else {
            return;
        };
        let services = self
            .ctx
            .store
            .property_values(&property, PROP_SERVICE_LINKS);
        for service in services {
            // Message keys distinguish ' ' from '_'.
            let key = format!("service_{}", service.replace(' ', "_"));
            let text = self.ctx.messages.resolve(&key, &params);
            self.infolinks.extend(parse_service_links(&text));
        }
        self.has_service_links = true;
    }

    /// Text serialisation of the assembled infolinks, for uniform layout in
    /// fact displays. The first link is set off from the value; further
    /// links are comma-joined behind it.
    pub fn infolink_text(&mut self, mode: OutputMode) -> String {
        let renderer = self.ctx.linker.clone();
        let rendered: Vec<String> = self
            .infolinks()
            .iter()
            .map(|link| match mode {
                OutputMode::Markup => link.markup(&*renderer),
                OutputMode::Html | OutputMode::File => link.html(&*renderer),
            })
            .collect();
        let mut iter = rendered.into_iter();
        let Some(first) = iter.next() else {
            return String::new();
        };
        let extras: Vec<String> = iter.collect();
        if extras.is_empty() {
            format!("  {first}")
        } else {
            format!("  {first} ({})", extras.join(", "))
        }
    }

    /// Export form of the value, or `None` when invalid. The default wraps
    /// the semicolon-joined, markup-stripped key-vector as an untyped
    /// literal; datatypes may override with structured nodes.
    pub fn export_data(&mut self) -> Option<ExportData> {
        if !self.is_valid() {
            return None;
        }
        if let Some(export) = self.datatype.export_data() {
            return Some(export);
        }
        let joined = self
            .db_keys()
            .iter()
            .map(Scalar::render)
            .collect::<Vec<_>>()
            .join(";");
        Some(ExportData::untyped_literal(strip_markup(&joined)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::{TYPE_PAGE, TYPE_QUANTITY, TYPE_TEXT};
    use test_log::test;

    fn factory() -> ValueFactory {
        ValueFactory::new(Arc::new(ValueContext::default()))
    }

    #[test]
    fn test_empty_container_is_invalid() {
        let mut value = factory().new_value(TYPE_TEXT);
        assert!(!value.is_valid());
        assert!(value.errors().is_empty());
        assert_eq!(value.hash(), "");
    }

    #[test]
    fn test_read_accessors_are_idempotent() {
        let mut value = factory().new_value(TYPE_QUANTITY);
        value.set_persisted_value(vec![Scalar::Float(5000.0), Scalar::Text("m".into())]);
        let first = (value.is_valid(), value.hash(), value.db_keys());
        for _ in 0..3 {
            assert_eq!(
                (value.is_valid(), value.hash(), value.db_keys()),
                first.clone()
            );
        }
    }

    #[test]
    fn test_marker_rejection_skips_parser() {
        let mut value = factory().new_value(TYPE_QUANTITY);
        value.set_user_value("5 \x7f km", None);
        assert!(!value.is_valid());
        // Exactly one parse error; the datatype parser never ran, so no
        // bad-number / bad-unit errors pile up behind it.
        assert_eq!(value.errors().len(), 1);
        assert_eq!(value.wiki_value(), None);

        let mut legacy = factory().new_value(TYPE_TEXT);
        legacy.set_user_value("a\x07b", None);
        assert_eq!(legacy.errors().len(), 1);
    }

    #[test]
    fn test_empty_persisted_vector_degrades() {
        let mut value = factory().new_value(TYPE_PAGE);
        value.set_persisted_value(vec![]);
        assert!(!value.is_valid());
        assert!(!value.errors().is_empty());
    }

    #[test]
    fn test_short_persisted_vector_degrades() {
        let mut value = factory().new_value(TYPE_QUANTITY);
        value.set_persisted_value(vec![Scalar::Text("not a number".into())]);
        assert!(!value.is_valid());
        assert!(!value.errors().is_empty());
        // And the error list is what hashes now.
        assert_eq!(value.hash(), value.errors().join("\t"));
    }

    #[test]
    fn test_hash_ignores_caption() {
        let mut a = factory().new_value(TYPE_TEXT);
        a.set_user_value("same value", Some("caption A"));
        let mut b = factory().new_value(TYPE_TEXT);
        b.set_user_value("same value", Some("caption B"));
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.short_markup(), b.short_markup());
    }

    #[test]
    fn test_assignment_paths_reset_each_other() {
        let mut value = factory().new_value(TYPE_QUANTITY);
        value.set_user_value("not a number at all", None);
        assert!(!value.is_valid());
        value.set_persisted_value(vec![Scalar::Float(1.0), Scalar::Text("m".into())]);
        assert!(value.is_valid());
        assert!(value.errors().is_empty());
        value.set_user_value("2 km", Some("two"));
        assert!(value.is_valid());
        assert_eq!(value.hash(), "2000\tm");
        assert_eq!(value.short_markup(), "two");
    }

    #[test]
    fn test_quantity_roundtrip_same_hash() {
        let factory = factory();
        let mut parsed = factory.new_value(TYPE_QUANTITY);
        parsed.set_user_value("5 km", None);
        assert_eq!(
            parsed.db_keys(),
            vec![Scalar::Float(5000.0), Scalar::Text("m".into())]
        );

        let mut restored = factory.new_value(TYPE_QUANTITY);
        restored.set_persisted_value(vec![Scalar::Float(5000.0), Scalar::Text("m".into())]);
        assert_eq!(parsed.hash(), restored.hash());
        // Same unit family on display.
        assert_eq!(restored.short_markup(), "5000 m");
        assert_eq!(parsed.short_markup(), "5 km");
    }

    #[test]
    fn test_output_format_reset() {
        let mut value = factory().new_value(TYPE_QUANTITY);
        value.set_output_format("km");
        value.set_persisted_value(vec![Scalar::Float(5000.0), Scalar::Text("m".into())]);
        assert_eq!(value.short_markup(), "5 km");
        value.set_output_format("");
        assert_eq!(value.short_markup(), "5000 m");
    }

    #[test]
    fn test_long_text_substitutes_errors() {
        let mut value = factory().new_value(TYPE_QUANTITY);
        value.set_user_value("5 furlongs", None);
        let long = value.long_text(OutputMode::Markup);
        assert!(long.contains("furlongs"));
        // Short text keeps what the user wrote, plus the tooltip.
        let short = value.short_text(OutputMode::Markup);
        assert!(short.starts_with("5 furlongs"));
        assert!(short.contains('⚠'));
    }

    #[test]
    fn test_file_mode_falls_back_to_html() {
        let mut value = factory().new_value(TYPE_TEXT);
        value.set_user_value("a < b", None);
        assert_eq!(
            value.short_text(OutputMode::File),
            value.short_text(OutputMode::Html)
        );
        assert!(value.short_text(OutputMode::File).contains("&lt;"));
    }

    #[test]
    fn test_export_default_literal() {
        let mut value = factory().new_value(TYPE_TEXT);
        value.set_user_value("plain", None);
        assert_eq!(
            value.export_data(),
            Some(ExportData::untyped_literal("plain"))
        );
    }

    #[test]
    fn test_export_absent_on_invalid() {
        let mut value = factory().new_value(TYPE_QUANTITY);
        value.set_user_value("bogus", None);
        assert_eq!(value.export_data(), None);

        let mut empty = factory().new_value(TYPE_TEXT);
        assert_eq!(empty.export_data(), None);
    }

    #[test]
    fn test_page_export_is_resource() {
        let mut value = factory().new_value(TYPE_PAGE);
        value.set_user_value("Help:Editing", None);
        let export = value.export_data().unwrap();
        assert!(export.is_resource());
    }

    #[test]
    fn test_infolinks_empty_without_property() {
        let mut value = factory().new_value(TYPE_TEXT);
        value.set_user_value("something", None);
        assert!(value.infolinks().is_empty());
        assert_eq!(value.infolink_text(OutputMode::Markup), "");
    }

    #[test]
    fn test_infolinks_idempotent_with_property() {
        let mut value = factory().new_value(TYPE_TEXT);
        value.set_property(PropertyHandle::new("P1", "Population"));
        value.set_user_value("12000", None);
        let first: Vec<Infolink> = value.infolinks().to_vec();
        assert_eq!(first.len(), 1);
        let second: Vec<Infolink> = value.infolinks().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn test_db_keys_never_empty() {
        let mut value = factory().new_value(TYPE_TEXT);
        value.set_user_value("", None);
        assert_eq!(value.db_keys().len(), 1);
    }
}
