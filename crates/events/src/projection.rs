use crate::Event;

/// A projection builds a read model from the event stream.
///
/// Read models are derived purely from events and are never written by anything
/// else. Delivery is at-least-once, so `apply` must be **idempotent**: applying the
/// same event twice must leave the read model as applying it once did.
///
/// `apply` takes `&self`: projections are shared between the delivery worker and
/// the readers, so implementations use interior, concurrency-safe storage.
///
/// Events that are irrelevant to a projection are ignored, not reported.
pub trait Projection: Send + Sync {
    type Ev: Event;

    fn apply(&self, event: &Self::Ev);
}
