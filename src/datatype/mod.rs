//! Datatype implementations and the registry that selects them by type id.
//!
//! ## Key Components
//!
//! - [`Datatype`] trait - the two required parse hooks plus optional
//!   override hooks each concrete datatype may implement
//! - [`DatatypeRegistry`] - maps type ids to datatype constructors
//! - [`ValueFactory`] - constructs [`TypedValue`] containers, falling back
//!   to [`unknown::UnknownValue`] for unregistered type ids
//! - [`ParseCx`] - the mutable view a parser gets into its container
//!
//! ## Built-in Datatypes
//!
//! - **Text** ([`TYPE_TEXT`]) - via [`text::TextValue`]
//! - **Page reference** ([`TYPE_PAGE`]) - via [`page::PageValue`]
//! - **Quantity** ([`TYPE_QUANTITY`]) - via [`quantity::QuantityValue`]
//!
//! Register custom datatypes on the registry owned by a
//! [`ValueContext`](crate::context::ValueContext):
//!
//! ```rust
//! use ontic_core::{
//!     context::ValueContext,
//!     datatype::{Datatype, ParseCx, ValueFactory},
//!     properties::Scalar,
//! };
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct FlagValue {
//!     set: Option<bool>,
//! }
//!
//! impl Datatype for FlagValue {
//!     fn parse_user_value(&mut self, raw: &str, cx: &mut ParseCx<'_>) {
//!         match raw.trim() {
//!             "yes" => self.set = Some(true),
//!             "no" => self.set = Some(false),
//!             _ => cx.error("value-parse-error", &[]),
//!         }
//!     }
//!
//!     fn parse_db_keys(&mut self, keys: &[Scalar], cx: &mut ParseCx<'_>) {
//!         match keys.first().and_then(Scalar::as_number) {
//!             Some(n) => self.set = Some(n != 0.0),
//!             None => cx.error("value-malformed-keys", &[]),
//!         }
//!     }
//!
//!     fn db_keys(&self) -> Vec<Scalar> {
//!         vec![Scalar::Int(i64::from(self.set.unwrap_or(false)))]
//!     }
//!
//!     fn wiki_value(&self) -> Option<String> {
//!         self.set.map(|b| if b { "yes".into() } else { "no".into() })
//!     }
//! }
//!
//! let ctx = Arc::new(ValueContext::default());
//! ctx.registry.insert::<FlagValue>("_boo".to_string());
//! let mut value = ValueFactory::new(ctx).new_value("_boo");
//! value.set_user_value("yes", None);
//! assert!(value.is_valid());
//! ```

use parking_lot::RwLock;
use std::{sync::Arc, time::Duration};

use crate::{
    context::{MessageLookup, ValueContext},
    export::ExportData,
    properties::{PropertyHandle, Scalar, PROP_TYPE},
    value::TypedValue,
};

pub mod page;
pub mod quantity;
pub mod text;
pub mod unknown;

pub use page::PageValue;
pub use quantity::{QuantityValue, UnitTable};
pub use text::TextValue;
pub use unknown::UnknownValue;

/// Type id of the plain text datatype.
pub const TYPE_TEXT: &str = "_txt";
/// Type id of the page reference datatype.
pub const TYPE_PAGE: &str = "_wpg";
/// Type id of the quantity (number + unit) datatype.
pub const TYPE_QUANTITY: &str = "_qty";

/// The mutable view a datatype parser is handed by its container.
///
/// Parsers report failure by pushing errors (usually via [`ParseCx::error`]),
/// never by panicking: a parse that produced at least one error leaves the
/// container invalid, nothing more. A parser may also propose a caption when
/// the caller did not supply one.
pub struct ParseCx<'a> {
    pub errors: &'a mut Vec<String>,
    pub caption: &'a mut Option<String>,
    pub output_format: Option<&'a str>,
    pub messages: &'a dyn MessageLookup,
}

impl<'a> ParseCx<'a> {
    /// Resolve `key` with `args` through the message lookup and record the
    /// result as an error.
    pub fn error(&mut self, key: &str, args: &[String]) {
        let text = self.messages.resolve(key, args);
        self.errors.push(text);
    }

    /// Record an already-rendered error string.
    pub fn raw_error(&mut self, text: impl Into<String>) {
        self.errors.push(text.into());
    }

    /// Propose a caption; honored only when the caller supplied none.
    pub fn propose_caption(&mut self, caption: impl Into<String>) {
        if self.caption.is_none() {
            *self.caption = Some(caption.into());
        }
    }
}

/// Per-datatype parse, normalize, render and export behavior.
///
/// The two parse hooks are required; everything else has a default that most
/// datatypes keep. Implementations hold the parsed state themselves; the
/// container owns lifecycle, errors, caption and links.
pub trait Datatype: Send {
    /// Interpret a raw user-syntax string. Accumulate errors through `cx` on
    /// failure; never panic.
    fn parse_user_value(&mut self, raw: &str, cx: &mut ParseCx<'_>);

    /// Interpret a persisted key-vector. The vector is not guaranteed to
    /// have been produced by this implementation's [`Datatype::db_keys`]: it
    /// may be shorter than expected (but has at least one entry) and its
    /// scalars may have surprising shapes. Degrade to errors, never fault.
    fn parse_db_keys(&mut self, keys: &[Scalar], cx: &mut ParseCx<'_>);

    /// The normalized key-vector for this value. Must contain at least one
    /// entry, storage-ready, no derived data.
    fn db_keys(&self) -> Vec<Scalar>;

    /// The round-trippable user-syntax form (including units where
    /// applicable), or `None` when no value is held.
    fn wiki_value(&self) -> Option<String>;

    /// Default display label used when no caption overrides it. The output
    /// format hint, when set on the container, is passed through; datatypes
    /// are free to ignore it.
    fn display_label(&self, _output_format: Option<&str>) -> String {
        self.wiki_value().unwrap_or_default()
    }

    /// The fuller descriptive form used by long projections.
    fn long_label(&self, output_format: Option<&str>) -> String {
        self.display_label(output_format)
    }

    /// Approximate numeric ordering key, when the datatype has one.
    fn numeric_value(&self) -> Option<f64> {
        None
    }

    /// Whether [`Datatype::numeric_value`] is meaningful for this datatype.
    fn is_numeric(&self) -> bool {
        false
    }

    /// Positional parameters for service link templates, or `None` when the
    /// datatype does not support service links.
    fn service_link_params(&self) -> Option<Vec<String>> {
        None
    }

    /// Structured export override. `None` means "use the container default"
    /// (an untyped literal over the key-vector).
    fn export_data(&self) -> Option<ExportData> {
        None
    }
}

type DatatypeCtor = fn() -> Box<dyn Datatype + Send>;

fn construct_default<T: Datatype + Default + Send + 'static>() -> Box<dyn Datatype + Send> {
    Box::<T>::default()
}

// It is better to express the complexity of the shared registry than hide it.
// The DatatypeRegistry methods are used to properly unwrap this structure.
#[allow(clippy::type_complexity)]
pub struct DatatypeRegistry(Arc<RwLock<Vec<(String, DatatypeCtor)>>>);

impl Clone for DatatypeRegistry {
    fn clone(&self) -> Self {
        DatatypeRegistry(self.0.clone())
    }
}

impl DatatypeRegistry {
    /// Registry preloaded with the built-in datatypes.
    pub fn create() -> Self {
        DatatypeRegistry(Arc::new(RwLock::new(vec![
            (TYPE_TEXT.to_string(), construct_default::<TextValue>),
            (TYPE_PAGE.to_string(), construct_default::<PageValue>),
            (TYPE_QUANTITY.to_string(), construct_default::<QuantityValue>),
        ])))
    }

    /// Register a datatype constructor for `type_id`.
    ///
    /// If the type id is already registered, the constructor is overwritten
    /// and a log message emitted.
    pub fn insert<T: Datatype + Default + Send + 'static>(&self, type_id: String) {
        while self.0.is_locked() {
            tracing::info!(
                "[DatatypeRegistry::insert] Waiting for write access to the datatype registry"
            );
            std::thread::sleep(Duration::from_millis(100));
        }
        let mut writer = self.0.write_arc();
        if let Some(entry) = writer.iter_mut().find(|(id, _)| id == &type_id) {
            tracing::info!("[DatatypeRegistry::insert] Overwriting datatype for '{type_id}'");
            entry.1 = construct_default::<T>;
        } else {
            writer.push((type_id, construct_default::<T>));
        }
    }

    /// Construct a fresh datatype instance for `type_id`, or `None` if the
    /// type id is unregistered.
    pub fn construct(&self, type_id: &str) -> Option<Box<dyn Datatype + Send>> {
        while self.0.is_locked_exclusive() {
            tracing::info!(
                "[DatatypeRegistry::construct] Waiting for read access to the datatype registry"
            );
            std::thread::sleep(Duration::from_millis(100));
        }
        let reader = self.0.read_arc();
        reader
            .iter()
            .find(|(id, _ctor)| id == type_id)
            .map(|(_id, ctor)| ctor())
    }

    /// List all registered type ids.
    pub fn type_ids(&self) -> Vec<String> {
        while self.0.is_locked_exclusive() {
            tracing::info!(
                "[DatatypeRegistry::type_ids] Waiting for read access to the datatype registry"
            );
            std::thread::sleep(Duration::from_millis(100));
        }
        let reader = self.0.read_arc();
        reader.iter().map(|(id, _ctor)| id.clone()).collect()
    }
}

/// Constructs value containers against a shared [`ValueContext`].
///
/// Initialized once at process start and passed by reference to anything
/// that needs to build values; there is no ambient global registry.
#[derive(Clone, Debug)]
pub struct ValueFactory {
    ctx: Arc<ValueContext>,
}

impl ValueFactory {
    pub fn new(ctx: Arc<ValueContext>) -> Self {
        ValueFactory { ctx }
    }

    pub fn context(&self) -> &Arc<ValueContext> {
        &self.ctx
    }

    /// Construct an empty container for `type_id`.
    ///
    /// Unknown type ids never fault: the container is backed by
    /// [`UnknownValue`] and will report a registry error once a value is
    /// assigned to it.
    pub fn new_value(&self, type_id: &str) -> TypedValue {
        match self.ctx.registry.construct(type_id) {
            Some(datatype) => TypedValue::new(type_id, datatype, self.ctx.clone()),
            None => {
                tracing::debug!(
                    "[ValueFactory::new_value] No datatype registered for '{type_id}', \
                     falling back to UnknownValue"
                );
                TypedValue::new(
                    type_id,
                    Box::new(UnknownValue::new(type_id)),
                    self.ctx.clone(),
                )
            }
        }
    }

    /// Construct a container for the datatype `property` declares through
    /// its [`PROP_TYPE`] metadata, bound to that property. Properties with
    /// no declared type default to text.
    pub fn value_for_property(&self, property: &PropertyHandle) -> TypedValue {
        let type_id = self
            .ctx
            .store
            .property_values(property, PROP_TYPE)
            .into_iter()
            .next()
            .unwrap_or_else(|| TYPE_TEXT.to_string());
        let mut value = self.new_value(&type_id);
        value.set_property(property.clone());
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_registry_builtins() {
        let registry = DatatypeRegistry::create();
        assert!(registry.construct(TYPE_TEXT).is_some());
        assert!(registry.construct(TYPE_PAGE).is_some());
        assert!(registry.construct(TYPE_QUANTITY).is_some());
        assert!(registry.construct("_nope").is_none());
    }

    #[test]
    fn test_registry_overwrite() {
        let registry = DatatypeRegistry::create();
        let before = registry.type_ids().len();
        registry.insert::<TextValue>(TYPE_TEXT.to_string());
        assert_eq!(registry.type_ids().len(), before);
        registry.insert::<TextValue>("_txt2".to_string());
        assert_eq!(registry.type_ids().len(), before + 1);
    }

    #[test]
    fn test_registry_constructs_fresh_instances() {
        let registry = DatatypeRegistry::create();
        let a = registry.construct(TYPE_TEXT).unwrap();
        let b = registry.construct(TYPE_TEXT).unwrap();
        // Fresh boxes, not shared state.
        assert!(!std::ptr::eq(a.as_ref(), b.as_ref()));
    }

    #[test]
    fn test_factory_unknown_type_is_invalid_not_fatal() {
        let factory = ValueFactory::new(Arc::new(ValueContext::default()));
        let mut value = factory.new_value("_does_not_exist");
        value.set_user_value("anything", None);
        assert!(!value.is_valid());
        assert_eq!(value.errors().len(), 1);
    }

    #[test]
    fn test_concurrent_registry_access() {
        use std::thread;

        let registry = DatatypeRegistry::create();
        let handles: Vec<_> = (0..5)
            .map(|i| {
                let registry = registry.clone();
                thread::spawn(move || {
                    registry.insert::<TextValue>(format!("_concurrent{i}"));
                    registry.construct(TYPE_TEXT).is_some()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        for i in 0..5 {
            assert!(registry.construct(&format!("_concurrent{i}")).is_some());
        }
    }
}
