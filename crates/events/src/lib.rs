//! Event bus mechanics and message abstractions (domain-agnostic).
//!
//! - `bus`: the `EventBus` contract and the `Subscription` a consumer reads from
//! - `in_memory_bus`: the in-process bus with durable per-subscriber mailboxes
//! - `channel`: the two-channel (commands / events) bus used by the ledger
//! - `command` / `event` / `handler` / `projection`: message-side traits

pub mod bus;
pub mod channel;
pub mod command;
pub mod event;
pub mod handler;
pub mod in_memory_bus;
mod mailbox;
pub mod projection;

pub use bus::{EventBus, RecvError, Subscription, SubscriptionHandle};
pub use channel::{Channel, Message, MessageBus};
pub use command::Command;
pub use event::Event;
pub use handler::CommandHandler;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use projection::Projection;
