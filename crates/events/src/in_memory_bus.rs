//! In-memory event bus.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::debug;

use crate::bus::{EventBus, Subscription};
use crate::mailbox::Mailbox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InMemoryBusError {
    /// Publish failed due to internal lock poisoning.
    #[error("event bus lock poisoned")]
    Poisoned,
    /// The bus was closed; nothing is delivered any more.
    #[error("event bus is closed")]
    Closed,
}

#[derive(Debug)]
struct Registry<M> {
    mailboxes: HashMap<Arc<str>, Arc<Mailbox<M>>>,
    closed: bool,
}

/// In-memory pub/sub bus (one channel).
///
/// - No IO / no async
/// - One mailbox per subscriber name, fed under the registry lock, so every
///   subscriber sees messages in the same total order
/// - Publishing never blocks on consumers (mailboxes are unbounded)
/// - Mailboxes of detached subscribers keep accumulating until the subscriber
///   comes back under the same name
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    registry: Mutex<Registry<M>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.registry.lock().map(|r| r.closed).unwrap_or(true)
    }

    /// Messages waiting for `subscriber` (0 for unknown subscribers).
    pub fn pending(&self, subscriber: &str) -> usize {
        self.registry
            .lock()
            .ok()
            .and_then(|r| r.mailboxes.get(subscriber).map(|m| m.pending()))
            .unwrap_or(0)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            registry: Mutex::new(Registry {
                mailboxes: HashMap::new(),
                closed: false,
            }),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let registry = self.registry.lock().map_err(|_| InMemoryBusError::Poisoned)?;
        if registry.closed {
            return Err(InMemoryBusError::Closed);
        }

        for mailbox in registry.mailboxes.values() {
            mailbox.deliver(message.clone());
        }

        Ok(())
    }

    fn subscribe(&self, subscriber: &str) -> Subscription<M> {
        let mut registry = match self.registry.lock() {
            Ok(r) => r,
            // Poisoned: hand out a subscription that is already closed.
            Err(_) => {
                let mailbox = Arc::new(Mailbox::new());
                mailbox.close();
                return Subscription::attach(subscriber.into(), mailbox);
            }
        };

        let name: Arc<str> = subscriber.into();
        let mailbox = registry
            .mailboxes
            .entry(name.clone())
            .or_insert_with(|| Arc::new(Mailbox::new()))
            .clone();
        if registry.closed {
            mailbox.close();
        }
        drop(registry);

        debug!(subscriber, pending = mailbox.pending(), "subscriber attached");
        Subscription::attach(name, mailbox)
    }

    fn close(&self) {
        let mut registry = match self.registry.lock() {
            Ok(r) => r,
            Err(poisoned) => poisoned.into_inner(),
        };
        if registry.closed {
            return;
        }
        registry.closed = true;
        for mailbox in registry.mailboxes.values() {
            mailbox.close();
        }
        debug!(subscribers = registry.mailboxes.len(), "event bus closed");
    }
}
