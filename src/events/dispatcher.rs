use futures::future::join_all;

use super::{Event, EventRegistry};

/// Routes inbound events to their registered handlers.
///
/// Dispatch never fails from the caller's perspective: payment providers
/// retry on non-2xx, and a retry storm caused by one failing handler must not
/// be triggered by unrelated handler failures. A handler error is logged with
/// the event id, type and handler name, and its siblings run to completion.
pub struct EventRouter {
    registry: EventRegistry,
}

impl EventRouter {
    pub fn new(registry: EventRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// Fan an event out to every handler registered for its kind.
    ///
    /// All handlers start together and dispatch completes when all have
    /// settled, so total latency is bounded by the slowest handler rather
    /// than the sum. Unknown or unregistered kinds are acknowledged no-ops.
    pub async fn dispatch(&self, event: &Event) {
        let Some(kind) = event.kind() else {
            tracing::debug!(
                event_id = %event.id,
                event_type = %event.event_type,
                "ignoring event of unknown type"
            );
            return;
        };

        let handlers = self.registry.resolve(kind);
        if handlers.is_empty() {
            tracing::debug!(
                event_id = %event.id,
                event_type = %event.event_type,
                "no handlers registered for event"
            );
            return;
        }

        tracing::debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            handlers = handlers.len(),
            "dispatching event"
        );

        let outcomes = join_all(handlers.iter().map(|handler| async move {
            (handler.name(), handler.handle(event).await)
        }))
        .await;

        for (name, outcome) in outcomes {
            if let Err(e) = outcome {
                // Swallowed on purpose: the provider gets a 200 either way.
                // The handler owns its own retry/alerting story.
                tracing::error!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    handler = name,
                    "webhook handler failed: {}",
                    e
                );
            }
        }
    }
}
