//! Unit Processor Registry
//!
//! Maps processor names (e.g. "load_notes") to executable closures, so the pool stays
//! generic and callers plug in their own per-unit logic.

use super::types::*;

use anyhow::Result;
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for a thread-safe, asynchronous unit processor.
/// It takes a `WorkUnit` and returns a Future that resolves to a `Result<()>`.
pub type UnitProcessorFn =
    Arc<dyn Fn(WorkUnit) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

/// Registry holding the mapping between processor names and their implementation.
pub struct UnitProcessorRegistry {
    processors: DashMap<String, UnitProcessorFn>,
}

impl UnitProcessorRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a processor under a specific name, replacing any previous one.
    pub fn register<F, Fut>(&self, name: &str, processor: F)
    where
        F: Fn(WorkUnit) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        // Box::pin erases the concrete future type so different closures share one map
        let processor_fn: UnitProcessorFn = Arc::new(move |unit: WorkUnit| {
            Box::pin(processor(unit)) as Pin<Box<dyn Future<Output = Result<()>> + Send>>
        });

        self.processors.insert(name.to_string(), processor_fn);

        tracing::debug!("Processor '{}' registered", name);
    }

    /// Resolves a processor by name.
    pub fn get(&self, name: &str) -> Option<UnitProcessorFn> {
        self.processors.get(name).map(|entry| entry.value().clone())
    }
}

impl Default for UnitProcessorRegistry {
    fn default() -> Self {
        Self {
            processors: DashMap::new(),
        }
    }
}
