//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::{collections::HashMap, sync::Arc};

use ontic_core::{
    context::{DefaultMessages, PropertyStore, ValueContext},
    properties::PropertyHandle,
};

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times - subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// In-memory property store keyed by (entity id, metadata property id).
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<(String, String), Vec<String>>,
}

impl MemoryStore {
    /// Record one metadata value for `property_id` on the entity `entity_id`.
    #[allow(dead_code)]
    pub fn add(&mut self, entity_id: &str, property_id: &str, value: &str) {
        self.entries
            .entry((entity_id.to_string(), property_id.to_string()))
            .or_default()
            .push(value.to_string());
    }
}

impl PropertyStore for MemoryStore {
    fn property_values(&self, entity: &PropertyHandle, property_id: &str) -> Vec<String> {
        self.entries
            .get(&(entity.id.clone(), property_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

/// Build a shared context over an in-memory store and message table.
#[allow(dead_code)]
pub fn context_with(store: MemoryStore, messages: DefaultMessages) -> Arc<ValueContext> {
    Arc::new(
        ValueContext::default()
            .with_store(Arc::new(store))
            .with_messages(Arc::new(messages)),
    )
}
