/// A command is an intent to change state (command abstraction).
///
/// Commands are **transient**: they are not stored, they are turned into events.
///
/// ## Identity
///
/// Every command carries a unique id. Delivery is at-least-once, so handlers use
/// `command_id()` to recognise a command they have already processed; two commands
/// with the same id are the same command regardless of their payload.
///
/// ## Design Constraints
///
/// Commands must be cloneable (retries, redelivery), `Send + Sync` (they cross
/// worker threads) and `'static` (they own all their data).
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync;

    fn command_id(&self) -> &Self::Id;

    /// Stable command name (e.g. "transfers.transfer_money").
    fn command_type(&self) -> &'static str;
}
