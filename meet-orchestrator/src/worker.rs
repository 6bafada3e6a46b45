use std::collections::HashMap;
use std::sync::Arc;

use crate::task::{ForkGenerator, TaskHandler};

/// Handlers and fork generators keyed by DAG task ref. One registry is built
/// once at process startup (meet-worker's `main.rs`) from every concrete
/// task in meet-pipeline and shared across runs.
#[derive(Clone, Default)]
pub struct Registry {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
    generators: HashMap<String, Arc<dyn ForkGenerator>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_handler(mut self, task_ref: impl Into<String>, handler: Arc<dyn TaskHandler>) -> Self {
        self.handlers.insert(task_ref.into(), handler);
        self
    }

    pub fn register_generator(mut self, task_ref: impl Into<String>, generator: Arc<dyn ForkGenerator>) -> Self {
        self.generators.insert(task_ref.into(), generator);
        self
    }

    pub fn handler(&self, task_ref: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(task_ref).cloned()
    }

    pub fn generator(&self, task_ref: &str) -> Option<Arc<dyn ForkGenerator>> {
        self.generators.get(task_ref).cloned()
    }
}
