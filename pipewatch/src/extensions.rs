use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::Arc,
};

/// Per-context bag of cross-cutting metadata keyed by type.
///
/// The pipeline fills the bag while it builds a stage context (for instance
/// with the [`ActiveSagaInstance`](crate::ActiveSagaInstance) a handler runs
/// against). Once the context is emitted it is shared read-only.
#[derive(Clone, Default)]
pub struct Extensions {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, replacing any previous value of the same type.
    pub fn insert<V: Any + Send + Sync>(&mut self, value: V) {
        self.entries.insert(TypeId::of::<V>(), Arc::new(value));
    }

    pub fn get<V: Any + Send + Sync>(&self) -> Option<&V> {
        self.entries
            .get(&TypeId::of::<V>())
            .and_then(|value| value.downcast_ref::<V>())
    }

    pub fn contains<V: Any + Send + Sync>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<V>())
    }

    pub fn remove<V: Any + Send + Sync>(&mut self) -> bool {
        self.entries.remove(&TypeId::of::<V>()).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}
