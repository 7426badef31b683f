use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

use super::{Event, EventKind};

/// One webhook side-effect. Handlers registered for the same kind must be
/// independent: insertion order is preserved for observability only, and no
/// handler may assume another ran first. At-most-once side effects (e.g. the
/// ledger credit) are each handler's own responsibility.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Stable name for log lines.
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &Event) -> Result<()>;
}

/// Immutable mapping from event kind to its ordered handler list. Built once
/// by the composition root via [`EventRegistryBuilder`]; there is no
/// unregistration.
pub struct EventRegistry {
    handlers: HashMap<EventKind, Vec<Arc<dyn EventHandler>>>,
}

impl EventRegistry {
    pub fn builder() -> EventRegistryBuilder {
        EventRegistryBuilder {
            handlers: HashMap::new(),
        }
    }

    /// Handlers for a kind, in registration order. Empty slice when none.
    pub fn resolve(&self, kind: EventKind) -> &[Arc<dyn EventHandler>] {
        self.handlers.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total registrations, across all kinds.
    pub fn handler_count(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }
}

pub struct EventRegistryBuilder {
    handlers: HashMap<EventKind, Vec<Arc<dyn EventHandler>>>,
}

impl EventRegistryBuilder {
    /// Append a handler to the list for `kind`, creating the list if absent.
    pub fn on(mut self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.entry(kind).or_default().push(handler);
        self
    }

    pub fn build(self) -> EventRegistry {
        EventRegistry {
            handlers: self.handlers,
        }
    }
}
