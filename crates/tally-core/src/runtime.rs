//! Dispatch of dequeued messages to the handler registered for their kind.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{Message, TaskKind};
use crate::error::{RegistryError, TaskError};

#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Run the side effect for one delivery. The payload is untyped here;
    /// handlers validate it before calling out.
    async fn handle(&self, message: &Message) -> Result<(), TaskError>;
}

/// One handler per `TaskKind`. Filled at startup, then shared read-only.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TaskKind, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails on a second handler for the same kind.
    pub fn register(
        &mut self,
        kind: TaskKind,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<(), RegistryError> {
        match self.handlers.entry(kind) {
            Entry::Occupied(slot) => {
                Err(RegistryError::DuplicateHandler(slot.key().clone()))
            }
            Entry::Vacant(slot) => {
                slot.insert(handler);
                Ok(())
            }
        }
    }

    pub fn get(&self, kind: &TaskKind) -> Option<&Arc<dyn TaskHandler>> {
        self.handlers.get(kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

pub struct Runtime {
    registry: Arc<HandlerRegistry>,
}

impl Runtime {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Run the handler for `message.kind`.
    ///
    /// A kind nobody registered is `TaskError::UnknownKind`, which the worker
    /// reports as an ordinary failure.
    pub async fn execute(&self, message: &Message) -> Result<(), TaskError> {
        let Some(handler) = self.registry.get(&message.kind) else {
            return Err(TaskError::UnknownKind(message.kind.to_string()));
        };
        debug!(message_id = %message.id, kind = %message.kind, "dispatching");
        handler.handle(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Payload;

    struct Noop;

    #[async_trait]
    impl TaskHandler for Noop {
        async fn handle(&self, _message: &Message) -> Result<(), TaskError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatches_to_handler_for_kind() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(TaskKind::LaborCostReport, Arc::new(Noop))
            .unwrap();

        let runtime = Runtime::new(Arc::new(registry));

        let msg = Message::new(TaskKind::LaborCostReport, Payload::new(), 5);
        runtime.execute(&msg).await.unwrap();
    }

    #[tokio::test]
    async fn unregistered_kind_is_unknown() {
        let runtime = Runtime::new(Arc::new(HandlerRegistry::new()));

        let msg = Message::new(TaskKind::Other("payroll_sync".into()), Payload::new(), 5);
        let err = runtime.execute(&msg).await.unwrap_err();
        assert!(matches!(&err, TaskError::UnknownKind(kind) if kind == "payroll_sync"));
        assert!(err.to_string().contains("handler"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(TaskKind::EmailNotification, Arc::new(Noop))
            .unwrap();

        let err = registry
            .register(TaskKind::EmailNotification, Arc::new(Noop))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateHandler(TaskKind::EmailNotification)));
        assert_eq!(registry.len(), 1);
    }
}
