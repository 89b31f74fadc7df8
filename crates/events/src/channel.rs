//! Two-channel message bus: commands and events travel independently.

use crate::bus::{EventBus, Subscription};
use crate::in_memory_bus::{InMemoryBusError, InMemoryEventBus};

/// The channel a message travels on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    Command,
    Event,
}

/// Anything that can be published on a [`MessageBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<C, E> {
    Command(C),
    Event(E),
}

impl<C, E> Message<C, E> {
    pub fn channel(&self) -> Channel {
        match self {
            Message::Command(_) => Channel::Command,
            Message::Event(_) => Channel::Event,
        }
    }
}

/// A bus with one command channel and one event channel.
///
/// A message published on one channel is never delivered on the other. Each
/// channel keeps its own ordering and its own set of named subscribers.
#[derive(Debug)]
pub struct MessageBus<C, E> {
    commands: InMemoryEventBus<C>,
    events: InMemoryEventBus<E>,
}

impl<C, E> Default for MessageBus<C, E> {
    fn default() -> Self {
        Self {
            commands: InMemoryEventBus::new(),
            events: InMemoryEventBus::new(),
        }
    }
}

impl<C, E> MessageBus<C, E>
where
    C: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a message to the channel it belongs to.
    pub fn publish(&self, message: Message<C, E>) -> Result<(), InMemoryBusError> {
        match message {
            Message::Command(command) => self.commands.publish(command),
            Message::Event(event) => self.events.publish(event),
        }
    }

    pub fn publish_command(&self, command: C) -> Result<(), InMemoryBusError> {
        self.commands.publish(command)
    }

    pub fn publish_event(&self, event: E) -> Result<(), InMemoryBusError> {
        self.events.publish(event)
    }

    pub fn subscribe_commands(&self, subscriber: &str) -> Subscription<C> {
        self.commands.subscribe(subscriber)
    }

    pub fn subscribe_events(&self, subscriber: &str) -> Subscription<E> {
        self.events.subscribe(subscriber)
    }

    pub fn commands(&self) -> &InMemoryEventBus<C> {
        &self.commands
    }

    pub fn events(&self) -> &InMemoryEventBus<E> {
        &self.events
    }

    /// Messages waiting for `subscriber` on `channel`.
    pub fn pending(&self, channel: Channel, subscriber: &str) -> usize {
        match channel {
            Channel::Command => self.commands.pending(subscriber),
            Channel::Event => self.events.pending(subscriber),
        }
    }

    /// Close both channels. Idempotent.
    pub fn close(&self) {
        self.commands.close();
        self.events.close();
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed() && self.events.is_closed()
    }
}
