use crate::{Command, Event};

/// Handles a command and emits events (command handler abstraction).
///
/// The handler decides; the caller publishes. Business-rule rejections should be
/// expressed as events so every outcome travels the same path. `Error` is reserved
/// for unexpected faults (storage hiccups and the like) that the caller may retry.
///
/// Handlers receive commands at-least-once and must therefore be idempotent with
/// respect to `Command::command_id`.
pub trait CommandHandler {
    type Cmd: Command;
    type Ev: Event;
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn handle(&self, command: &Self::Cmd) -> Result<Vec<Self::Ev>, Self::Error>;
}
