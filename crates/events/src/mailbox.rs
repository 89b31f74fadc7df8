//! Per-subscriber outbound queue.
//!
//! A mailbox outlives the subscriptions reading from it: while its subscriber is
//! detached, published messages keep accumulating and are handed to the next
//! subscription attached under the same name.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::bus::RecvError;

#[derive(Debug)]
struct State<M> {
    queue: VecDeque<M>,
    /// Generation of the subscription currently allowed to consume.
    attached: Option<u64>,
    generation: u64,
    closed: bool,
}

#[derive(Debug)]
pub(crate) struct Mailbox<M> {
    state: Mutex<State<M>>,
    ready: Condvar,
}

/// Type-erased attachment control, so subscription handles need not know `M`.
pub(crate) trait Attachment: Send + Sync {
    fn detach(&self, generation: u64);
    fn is_attached(&self, generation: u64) -> bool;
}

impl<M> Mailbox<M> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                attached: None,
                generation: 0,
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    // The state stays consistent across a panic (every mutation is a single
    // VecDeque/field update), so a poisoned lock is recovered.
    fn lock(&self) -> MutexGuard<'_, State<M>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a new consumer, superseding any previous one. Returns its generation.
    pub(crate) fn attach(&self) -> u64 {
        let mut state = self.lock();
        state.generation += 1;
        let generation = state.generation;
        if !state.closed {
            state.attached = Some(generation);
        }
        self.ready.notify_all();
        generation
    }

    pub(crate) fn deliver(&self, message: M) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.queue.push_back(message);
        self.ready.notify_all();
    }

    pub(crate) fn requeue(&self, message: M) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.queue.push_front(message);
        self.ready.notify_all();
    }

    pub(crate) fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.attached = None;
        state.queue.clear();
        self.ready.notify_all();
    }

    /// Detach `generation` if it is still the attached consumer.
    pub(crate) fn release(&self, generation: u64) {
        let mut state = self.lock();
        if state.attached == Some(generation) {
            state.attached = None;
        }
        self.ready.notify_all();
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        let state = self.lock();
        !state.closed && state.attached == Some(generation)
    }

    pub(crate) fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    /// Take the next message for `generation`.
    ///
    /// - `deadline == None` and `block == true`: wait until a message arrives or the
    ///   subscription stops being attached
    /// - `block == false`: never wait
    pub(crate) fn take(
        &self,
        generation: u64,
        block: bool,
        deadline: Option<Instant>,
    ) -> Result<M, RecvError> {
        let mut state = self.lock();
        loop {
            if state.closed || state.attached != Some(generation) {
                return Err(RecvError::Closed);
            }
            if let Some(message) = state.queue.pop_front() {
                return Ok(message);
            }
            if !block {
                return Err(RecvError::Empty);
            }

            state = match deadline {
                None => self.ready.wait(state).unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(RecvError::Timeout);
                    }
                    self.ready
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }
}

impl<M: Send> Attachment for Mailbox<M> {
    fn detach(&self, generation: u64) {
        self.release(generation);
    }

    fn is_attached(&self, generation: u64) -> bool {
        self.is_current(generation)
    }
}
