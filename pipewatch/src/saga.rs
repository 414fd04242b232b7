use std::{any::Any, fmt, sync::Arc};

use uuid::Uuid;

use crate::TypeKey;

/// Saga-instance state a handler invocation ran against.
///
/// The pipeline stores it in the handler context's
/// [`Extensions`](crate::Extensions) when the invoked handler is a saga.
/// `not_found` is set when the message could not be correlated to an
/// existing instance (and did not start a new one); `completed` is set when
/// the saga marked itself complete while handling the message.
#[derive(Clone)]
pub struct ActiveSagaInstance {
    saga_id: Uuid,
    saga_type: TypeKey,
    not_found: bool,
    completed: bool,
    entity: Arc<dyn Any + Send + Sync>,
    entity_type: TypeKey,
}

impl ActiveSagaInstance {
    /// Creates a found, not yet completed instance for saga `S` holding `entity`.
    pub fn new<S: 'static, D: Any + Send + Sync>(saga_id: Uuid, entity: D) -> Self {
        Self {
            saga_id,
            saga_type: TypeKey::of::<S>(),
            not_found: false,
            completed: false,
            entity: Arc::new(entity),
            entity_type: TypeKey::of::<D>(),
        }
    }

    /// Instance for saga `S` whose lookup found nothing.
    pub fn not_found<S: 'static>(saga_id: Uuid) -> Self {
        Self {
            not_found: true,
            ..Self::new::<S, ()>(saga_id, ())
        }
    }

    pub fn mark_completed(mut self) -> Self {
        self.completed = true;
        self
    }

    pub fn saga_id(&self) -> Uuid {
        self.saga_id
    }

    pub fn saga_type(&self) -> TypeKey {
        self.saga_type
    }

    pub fn is_not_found(&self) -> bool {
        self.not_found
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Returns the saga data as `D` if it is of that type.
    pub fn entity<D: Any + Send + Sync>(&self) -> Option<&D> {
        self.entity.downcast_ref::<D>()
    }

    pub fn entity_type(&self) -> TypeKey {
        self.entity_type
    }
}

impl fmt::Debug for ActiveSagaInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSagaInstance")
            .field("saga_id", &self.saga_id)
            .field("saga_type", &self.saga_type)
            .field("not_found", &self.not_found)
            .field("completed", &self.completed)
            .field("entity_type", &self.entity_type)
            .finish()
    }
}
