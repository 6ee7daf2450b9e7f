//! # ontic-core
//!
//! A Rust library for typed semantic data values: parsing user-syntax
//! annotations into normalized, storable, renderable property values.
//!
//! The name "ontic" relates to what *is* - the factual assertions a
//! knowledge base holds about its entities.
//!
//! ## Overview
//!
//! ontic-core models one property value as a [`value::TypedValue`]
//! container. The container is populated either from a raw user-syntax
//! string or from a persisted key-vector, normalizes through a
//! type-specific parser, and then answers for validity, storage keys,
//! display projections, auxiliary links and export form. Bad input never
//! faults: errors accumulate inside the container and degrade that one
//! value only.
//!
//! ### Key Features
//!
//! - **Two entry paths**: eager parsing of user input, lazy parsing of
//!   persisted key-vectors (stub values unstub on first read)
//! - **Extensible datatypes**: a [`datatype::Datatype`] trait plus a
//!   registry mapping type ids to constructors; hosts register their own
//! - **Error tolerance**: parse failures and constraint violations become
//!   display strings on the value, never panics or early exits
//! - **Allowed-value constraints**: properties may enumerate their legal
//!   values; assignments outside the enumeration are flagged
//! - **Auxiliary links**: a search link per value plus configurable
//!   per-property service links rendered from message templates
//! - **Export form**: values project to literal or resource nodes for
//!   RDF-style serialization
//!
//! ## Architecture
//!
//! - **[`value`]**: the [`value::TypedValue`] container (lifecycle, errors,
//!   projections, links, export)
//! - **[`datatype`]**: the [`datatype::Datatype`] trait, the registry, the
//!   factory and the built-in text/page/quantity datatypes
//! - **[`context`]**: host collaborator traits (property store, message
//!   lookup, link rendering) bundled into a [`context::ValueContext`]
//! - **[`properties`]**: scalar key types, property handles, output modes
//! - **[`infolink`]**: auxiliary link targets and service link parsing
//! - **[`export`]**: export node model and markup stripping
//!
//! ## Quick Start
//!
//! ```rust
//! use ontic_core::{context::ValueContext, datatype::{ValueFactory, TYPE_QUANTITY}};
//! use std::sync::Arc;
//!
//! let factory = ValueFactory::new(Arc::new(ValueContext::default()));
//!
//! let mut value = factory.new_value(TYPE_QUANTITY);
//! value.set_user_value("5 km", None);
//! assert!(value.is_valid());
//! assert_eq!(value.hash(), "5000\tm");
//! assert_eq!(value.short_markup(), "5 km");
//! ```

pub mod context;
pub mod datatype;
pub mod error;
pub mod export;
pub mod infolink;
pub mod properties;
pub mod value;

pub use error::*;
