//! Event publishing/subscription abstraction (mechanics only).
//!
//! This module provides the **event bus pattern**: a pub/sub mechanism distributing
//! messages to every subscriber of a channel.
//!
//! ## Delivery Guarantees
//!
//! - **At-least-once**: a message may be delivered more than once (redelivery after a
//!   consumer failure), so consumers must be idempotent
//! - **Per-publisher FIFO**: messages from one publisher reach each subscriber in
//!   publish order
//! - **Fire-and-forget**: `publish` never waits for consumption
//! - **No persistence**: nothing survives the process
//!
//! ## Named, durable subscriptions
//!
//! Subscribers subscribe under a stable name. The bus keeps one mailbox per name; a
//! subscriber that terminates and subscribes again under the same name resumes from
//! the messages that accumulated in the meantime.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::mailbox::{Attachment, Mailbox};

/// Why a receive call returned without a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum RecvError {
    /// `try_recv`: nothing queued right now.
    #[error("no message available")]
    Empty,
    /// `recv_timeout`: nothing arrived before the timeout.
    #[error("timed out waiting for a message")]
    Timeout,
    /// The subscription was closed, superseded, or the bus was closed.
    #[error("subscription closed")]
    Closed,
}

/// A subscription to one channel of an event bus.
///
/// ## Usage Pattern
///
/// ```ignore
/// let subscription = bus.subscribe("transfer-processor");
///
/// loop {
///     match subscription.recv_timeout(Duration::from_millis(100)) {
///         Ok(message) => process(message)?,
///         Err(RecvError::Timeout) => continue,
///         Err(_) => break, // closed
///     }
/// }
/// ```
///
/// ## Thread Safety
///
/// A subscription is consumed by one worker thread. Other threads observe or stop
/// it through a cloneable [`SubscriptionHandle`].
///
/// Dropping a subscription detaches it; the mailbox (and anything still queued in
/// it) stays with the bus.
pub struct Subscription<M> {
    subscriber: Arc<str>,
    mailbox: Arc<Mailbox<M>>,
    generation: u64,
}

impl<M> core::fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("subscriber", &self.subscriber)
            .field("generation", &self.generation)
            .finish()
    }
}

impl<M: Send + 'static> Subscription<M> {
    pub(crate) fn attach(subscriber: Arc<str>, mailbox: Arc<Mailbox<M>>) -> Self {
        let generation = mailbox.attach();
        Self {
            subscriber,
            mailbox,
            generation,
        }
    }

    pub fn subscriber(&self) -> &str {
        &self.subscriber
    }

    /// Block until the next message is available or the subscription closes.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.mailbox.take(self.generation, true, None)
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, RecvError> {
        self.mailbox.take(self.generation, false, None)
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvError> {
        self.mailbox
            .take(self.generation, true, Some(Instant::now() + timeout))
    }

    /// Put an unprocessed message back at the head of the mailbox.
    ///
    /// Works after the subscription closed as well: the message waits for the next
    /// subscription under the same name.
    pub fn requeue(&self, message: M) {
        self.mailbox.requeue(message);
    }

    /// Stop delivery to this subscription. Idempotent.
    pub fn close(&self) {
        self.mailbox.release(self.generation);
    }

    pub fn is_closed(&self) -> bool {
        !self.mailbox.is_current(self.generation)
    }

    /// Number of messages waiting in this subscriber's mailbox.
    pub fn pending(&self) -> usize {
        self.mailbox.pending()
    }

    pub fn handle(&self) -> SubscriptionHandle {
        SubscriptionHandle {
            subscriber: self.subscriber.clone(),
            attachment: self.mailbox.clone(),
            generation: self.generation,
        }
    }
}

impl<M> Drop for Subscription<M> {
    fn drop(&mut self) {
        self.mailbox.release(self.generation);
    }
}

/// Cloneable, type-erased view of a subscription: poll for termination or close it.
#[derive(Clone)]
pub struct SubscriptionHandle {
    subscriber: Arc<str>,
    attachment: Arc<dyn Attachment>,
    generation: u64,
}

impl core::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("subscriber", &self.subscriber)
            .field("generation", &self.generation)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl SubscriptionHandle {
    pub fn subscriber(&self) -> &str {
        &self.subscriber
    }

    /// Stop delivery to the subscription. Idempotent.
    pub fn close(&self) {
        self.attachment.detach(self.generation);
    }

    /// `true` once the subscription was closed, superseded, or the bus closed.
    pub fn is_closed(&self) -> bool {
        !self.attachment.is_attached(self.generation)
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// ## Design Principles
///
/// - **Lightweight contract**: publish, subscribe, close
/// - **Broadcast semantics**: every subscriber present at publish time gets its own copy
/// - **Transport-agnostic**: the ledger ships an in-memory implementation only
///
/// ## Error Handling
///
/// `publish()` fails only when the bus can no longer deliver (closed, poisoned).
/// Subscribers never see errors for messages; a closed bus simply completes their
/// subscriptions.
///
/// ## Thread Safety
///
/// `Send + Sync`: many threads may publish concurrently.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    /// Attach `subscriber`, superseding any earlier subscription under that name.
    fn subscribe(&self, subscriber: &str) -> Subscription<M>;

    /// Complete every subscription and refuse further publishes.
    fn close(&self);
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self, subscriber: &str) -> Subscription<M> {
        (**self).subscribe(subscriber)
    }

    fn close(&self) {
        (**self).close()
    }
}
