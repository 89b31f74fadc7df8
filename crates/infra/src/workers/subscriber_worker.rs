use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, warn};

use ledger_events::{RecvError, Subscription, SubscriptionHandle};

/// Handle to observe, stop and join a subscriber worker.
#[derive(Debug)]
pub struct WorkerHandle {
    subscription: SubscriptionHandle,
    terminated: Arc<AtomicBool>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn subscriber(&self) -> &str {
        self.subscription.subscriber()
    }

    /// `true` once the delivery loop has exited or its subscription was closed.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire) || self.subscription.is_closed()
    }

    /// Stop delivery without waiting; the worker finishes the message in hand.
    pub fn close(&self) {
        self.subscription.close();
    }

    /// Stop delivery and wait for the worker to exit.
    pub fn shutdown(mut self) {
        self.subscription.close();
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Generic subscriber worker loop.
///
/// - Drains one bus subscription on a dedicated thread
/// - Runs the handler for each message, one at a time, in delivery order
/// - A handler error or panic puts the message back at the head of the
///   mailbox and ends the loop; the supervisor re-attaches the subscriber
#[derive(Debug)]
pub struct SubscriberWorker;

impl SubscriberWorker {
    /// Spawn a worker thread consuming `subscription`.
    ///
    /// `handler` must be idempotent: a message it failed on is delivered again.
    pub fn spawn<M, H, E>(
        name: &str,
        subscription: Subscription<M>,
        mut handler: H,
    ) -> io::Result<WorkerHandle>
    where
        M: Send + 'static,
        H: FnMut(&M) -> Result<(), E> + Send + 'static,
        E: core::fmt::Debug + Send + 'static,
    {
        let terminated = Arc::new(AtomicBool::new(false));
        let handle = subscription.handle();

        let guard = TerminationGuard(terminated.clone());
        let worker = name.to_string();
        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _guard = guard;
                worker_loop(&worker, subscription, &mut handler);
            })?;

        Ok(WorkerHandle {
            subscription: handle,
            terminated,
            join: Some(join),
        })
    }
}

/// Flags the worker as terminated however its thread ends.
struct TerminationGuard(Arc<AtomicBool>);

impl Drop for TerminationGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

fn worker_loop<M, H, E>(name: &str, sub: Subscription<M>, handler: &mut H)
where
    M: Send + 'static,
    H: FnMut(&M) -> Result<(), E>,
    E: core::fmt::Debug,
{
    let tick = Duration::from_millis(250);
    debug!(worker = name, pending = sub.pending(), "subscriber worker started");

    loop {
        let msg = match sub.recv_timeout(tick) {
            Ok(msg) => msg,
            Err(RecvError::Timeout) | Err(RecvError::Empty) => continue,
            Err(RecvError::Closed) => break,
        };

        match panic::catch_unwind(AssertUnwindSafe(|| handler(&msg))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(worker = name, error = ?err, "subscriber handler failed; terminating");
                sub.requeue(msg);
                break;
            }
            Err(payload) => {
                error!(
                    worker = name,
                    panic = panic_message(payload.as_ref()),
                    "subscriber handler panicked; terminating"
                );
                sub.requeue(msg);
                break;
            }
        }
    }

    debug!(worker = name, "subscriber worker stopped");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Instant;

    use ledger_events::{EventBus, InMemoryEventBus};

    use super::*;

    fn wait_until(what: &str, cond: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn handles_messages_in_order() {
        let bus = InMemoryEventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handle = SubscriberWorker::spawn("ordered", bus.subscribe("ordered"), move |m: &u32| {
            sink.lock().unwrap().push(*m);
            Ok::<(), ()>(())
        })
        .unwrap();

        for i in 0..10 {
            bus.publish(i).unwrap();
        }

        wait_until("all messages", || seen.lock().unwrap().len() == 10);
        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
        assert!(!handle.is_terminated());
        handle.shutdown();
    }

    #[test]
    fn handler_error_requeues_and_terminates() {
        let bus = InMemoryEventBus::new();
        let handle = SubscriberWorker::spawn("failing", bus.subscribe("failing"), |_: &u32| {
            Err::<(), _>("boom")
        })
        .unwrap();

        bus.publish(7).unwrap();

        wait_until("termination", || handle.is_terminated());
        assert_eq!(bus.pending("failing"), 1);

        let again = bus.subscribe("failing");
        assert_eq!(again.recv_timeout(Duration::from_millis(100)), Ok(7));
    }

    #[test]
    fn handler_panic_is_contained() {
        let bus = InMemoryEventBus::new();
        let handle = SubscriberWorker::spawn("panicking", bus.subscribe("panicking"), |m: &u32| {
            if *m == 1 {
                panic!("cannot handle {m}");
            }
            Ok::<(), ()>(())
        })
        .unwrap();

        bus.publish(1).unwrap();

        wait_until("termination", || handle.is_terminated());
        assert_eq!(bus.pending("panicking"), 1);
        handle.shutdown();
    }

    #[test]
    fn close_stops_the_worker() {
        let bus = InMemoryEventBus::<u32>::new();
        let handle =
            SubscriberWorker::spawn("closable", bus.subscribe("closable"), |_| Ok::<(), ()>(()))
                .unwrap();

        handle.close();

        assert!(handle.is_terminated());
        handle.shutdown();
    }
}
