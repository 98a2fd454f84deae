use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::domain::{ProviderEvent, ProviderEventKind};
use crate::ports::{PortError, ProviderPort, SubscriptionId};

/// A live provider listener. Dropping it removes the listener.
pub struct Subscription<P: ProviderPort> {
    provider: Arc<P>,
    id: SubscriptionId,
    kind: ProviderEventKind,
    events: UnboundedReceiver<ProviderEvent>,
}

impl<P: ProviderPort> Subscription<P> {
    pub fn acquire(provider: &Arc<P>, kind: ProviderEventKind) -> Result<Self, PortError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = provider.subscribe(kind, tx)?;
        tracing::debug!(event = kind.event_name(), id = id.0, "provider listener registered");
        Ok(Self {
            provider: Arc::clone(provider),
            id,
            kind,
            events: rx,
        })
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn kind(&self) -> ProviderEventKind {
        self.kind
    }

    /// Takes every event delivered so far without waiting.
    pub fn drain(&mut self) -> Vec<ProviderEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

impl<P: ProviderPort> Drop for Subscription<P> {
    fn drop(&mut self) {
        self.provider.unsubscribe(self.id);
        tracing::debug!(
            event = self.kind.event_name(),
            id = self.id.0,
            "provider listener removed"
        );
    }
}

impl<P: ProviderPort> std::fmt::Debug for Subscription<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}
