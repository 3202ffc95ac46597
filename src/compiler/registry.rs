//! Resource processor registry
//!
//! Processors are registered in a process-wide catalog at startup. Each
//! pipeline takes an immutable snapshot of the catalog, so dispatch never
//! races with registration and concurrent runs share one read-only table.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::error::{HttpError, HttpResult};
use super::processors::{self, ResourceProcessor};

/// Shared handle to a processor
pub type ProcessorHandle = Arc<dyn ResourceProcessor>;

/// Global catalog of resource processors.
pub struct ProcessorCatalog {
    processors: RwLock<HashMap<String, ProcessorHandle>>,
}

static CATALOG: Lazy<ProcessorCatalog> = Lazy::new(ProcessorCatalog::with_builtins);

impl ProcessorCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            processors: RwLock::new(HashMap::new()),
        }
    }

    /// Create a catalog holding every built-in processor
    pub fn with_builtins() -> Self {
        let catalog = Self::new();
        for processor in processors::builtin() {
            catalog.register_handle(processor.resource_type(), processor);
        }
        catalog
    }

    /// Access the global catalog singleton.
    pub fn global() -> &'static Self {
        &CATALOG
    }

    /// Register a processor under the type it declares.
    pub fn register<P>(&self, processor: P)
    where
        P: ResourceProcessor + 'static,
    {
        let type_name = processor.resource_type();
        self.register_handle(type_name, Arc::new(processor));
    }

    /// Bind `type_name` to `processor`, replacing any earlier binding.
    pub fn register_handle(&self, type_name: &str, processor: ProcessorHandle) {
        let mut processors = self.processors.write();
        if processors
            .insert(type_name.to_string(), processor)
            .is_some()
        {
            tracing::warn!(resource_type = type_name, "replacing registered resource processor");
        }
    }

    /// Produce an immutable snapshot for a pipeline.
    pub fn snapshot(&self) -> ProcessorRegistry {
        let processors = self.processors.read();
        ProcessorRegistry {
            processors: Arc::new(processors.clone()),
        }
    }
}

impl Default for ProcessorCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable view of the processor catalog.
#[derive(Clone)]
pub struct ProcessorRegistry {
    processors: Arc<HashMap<String, ProcessorHandle>>,
}

impl ProcessorRegistry {
    /// Registry of the built-in processors only
    pub fn builtin() -> Self {
        ProcessorCatalog::with_builtins().snapshot()
    }

    /// Processor bound to `resource_type`.
    ///
    /// Fails with `UnsupportedTypeError` when nothing is registered.
    pub fn dispatch(&self, resource_type: &str) -> HttpResult<&ProcessorHandle> {
        self.processors.get(resource_type).ok_or_else(|| {
            HttpError::unsupported_type(format!("Unsupported resource type: {}", resource_type))
        })
    }

    /// Check whether the snapshot contains the specified type.
    pub fn has_type(&self, resource_type: &str) -> bool {
        self.processors.contains_key(resource_type)
    }

    /// All registered type names, sorted
    pub fn list_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.processors.keys().cloned().collect();
        types.sort();
        types
    }
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("types", &self.list_types())
            .finish()
    }
}
