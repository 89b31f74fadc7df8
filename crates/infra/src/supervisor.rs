//! Subscriber supervision: keeps long-lived bus subscribers attached and
//! re-attaches any whose worker terminated.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::workers::WorkerHandle;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to attach subscriber {name}: {source}")]
    Attach {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn health sweep thread: {0}")]
    Sweep(#[source] io::Error),
}

/// A long-lived consumer the supervisor keeps attached to bus `B`.
///
/// `subscribe` attaches under [`name`](BusSubscriber::name) and starts the
/// delivery loop. Calling it again supersedes the previous attachment.
pub trait BusSubscriber<B>: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn subscribe(&self, bus: &Arc<B>) -> io::Result<WorkerHandle>;
}

struct Entry<B> {
    subscriber: Arc<dyn BusSubscriber<B>>,
    worker: Mutex<Option<WorkerHandle>>,
    /// Serializes re-attachment; `worker` is only locked for swaps.
    resubscribe: Mutex<()>,
}

impl<B> Entry<B> {
    fn lock(&self) -> MutexGuard<'_, Option<WorkerHandle>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn serialize(&self) -> MutexGuard<'_, ()> {
        self.resubscribe.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_running(&self) -> bool {
        self.lock().as_ref().is_some_and(|w| !w.is_terminated())
    }

    /// Take the current worker out of its slot and wait for it to exit.
    fn shutdown_worker(&self) -> bool {
        let previous = self.lock().take();
        match previous {
            Some(worker) => {
                worker.shutdown();
                true
            }
            None => false,
        }
    }
}

struct Inner<B> {
    bus: Arc<B>,
    entries: Vec<Entry<B>>,
    active: AtomicBool,
}

impl<B: Send + Sync + 'static> Inner<B> {
    /// Callers hold `entry.serialize()`.
    fn attach(&self, entry: &Entry<B>) -> Result<(), SupervisorError> {
        entry.shutdown_worker();
        let worker = entry.subscriber.subscribe(&self.bus).map_err(|source| SupervisorError::Attach {
            name: entry.subscriber.name().to_string(),
            source,
        })?;
        *entry.lock() = Some(worker);
        Ok(())
    }

    fn heal(&self) -> usize {
        let mut recovered = 0;

        for entry in &self.entries {
            let _resubscribe = entry.serialize();
            if !self.active.load(Ordering::Acquire) {
                break;
            }
            if entry.is_running() {
                continue;
            }

            let name = entry.subscriber.name();
            warn!(subscriber = name, "subscriber terminated; resubscribing");
            match self.attach(entry) {
                Ok(()) => {
                    info!(subscriber = name, "subscriber recovered");
                    recovered += 1;
                }
                Err(err) => error!(subscriber = name, error = %err, "resubscription failed"),
            }
        }

        recovered
    }
}

impl<B> Inner<B> {
    fn is_healthy(&self) -> bool {
        self.active.load(Ordering::Acquire) && self.entries.iter().all(Entry::is_running)
    }
}

/// Handle for the running health sweep.
struct Sweeper {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl Sweeper {
    fn stop(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Owns the ledger's long-lived subscribers.
///
/// - Every subscriber is attached when the supervisor starts
/// - A sweep thread polls liveness every `interval` and re-attaches terminated
///   subscribers
/// - Re-attaching one subscriber is serialized; different subscribers recover
///   independently
pub struct SubscribersSupervisor<B> {
    inner: Arc<Inner<B>>,
    interval: Duration,
    sweeper: Mutex<Option<Sweeper>>,
}

impl<B: 'static> core::fmt::Debug for SubscribersSupervisor<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let names: Vec<&str> = self.inner.entries.iter().map(|e| e.subscriber.name()).collect();
        f.debug_struct("SubscribersSupervisor")
            .field("subscribers", &names)
            .field("interval", &self.interval)
            .field("active", &self.inner.active.load(Ordering::Relaxed))
            .finish()
    }
}

impl<B: Send + Sync + 'static> SubscribersSupervisor<B> {
    /// Attach every subscriber and start the health sweep.
    pub fn start(
        bus: Arc<B>,
        subscribers: Vec<Arc<dyn BusSubscriber<B>>>,
        interval: Duration,
    ) -> Result<Self, SupervisorError> {
        let supervisor = Self {
            inner: Arc::new(Inner {
                bus,
                entries: subscribers
                    .into_iter()
                    .map(|subscriber| Entry {
                        subscriber,
                        worker: Mutex::new(None),
                        resubscribe: Mutex::new(()),
                    })
                    .collect(),
                active: AtomicBool::new(false),
            }),
            interval,
            sweeper: Mutex::new(None),
        };
        supervisor.subscribe()?;
        Ok(supervisor)
    }

    /// Attach every subscriber from scratch and (re)start the sweep.
    pub fn subscribe(&self) -> Result<(), SupervisorError> {
        self.inner.active.store(true, Ordering::Release);

        for entry in &self.inner.entries {
            let resubscribe = entry.serialize();
            if let Err(err) = self.inner.attach(entry) {
                drop(resubscribe);
                self.unsubscribe();
                return Err(err);
            }
        }

        let mut sweeper = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if sweeper.is_none() {
            match self.spawn_sweeper() {
                Ok(s) => *sweeper = Some(s),
                Err(err) => {
                    drop(sweeper);
                    self.unsubscribe();
                    return Err(err);
                }
            }
        }

        info!(
            subscribers = self.inner.entries.len(),
            interval_ms = self.interval.as_millis() as u64,
            "subscribers attached"
        );
        Ok(())
    }

    /// Run one health sweep now. Returns how many subscribers were recovered.
    pub fn heal(&self) -> usize {
        self.inner.heal()
    }

    /// Forcibly terminate one subscriber's subscription; the next sweep
    /// re-attaches it. Returns `false` for unknown or unattached names.
    pub fn detach(&self, name: &str) -> bool {
        let Some(entry) = self.inner.entries.iter().find(|e| e.subscriber.name() == name) else {
            return false;
        };
        match entry.lock().as_ref() {
            Some(worker) => {
                warn!(subscriber = name, "detaching subscriber");
                worker.close();
                true
            }
            None => false,
        }
    }

    pub fn subscribers(&self) -> Vec<String> {
        self.inner
            .entries
            .iter()
            .map(|e| e.subscriber.name().to_string())
            .collect()
    }

    fn spawn_sweeper(&self) -> Result<Sweeper, SupervisorError> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let inner = self.inner.clone();
        let interval = self.interval;

        let join = thread::Builder::new()
            .name("subscribers-supervisor".to_string())
            .spawn(move || {
                loop {
                    match shutdown_rx.recv_timeout(interval) {
                        Err(mpsc::RecvTimeoutError::Timeout) => {
                            inner.heal();
                        }
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(SupervisorError::Sweep)?;

        Ok(Sweeper {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

impl<B> SubscribersSupervisor<B> {
    /// Detach every subscriber and cancel the sweep. Idempotent.
    pub fn unsubscribe(&self) {
        self.inner.active.store(false, Ordering::Release);

        let sweeper = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sweeper) = sweeper {
            sweeper.stop();
        }

        let mut detached = 0;
        for entry in &self.inner.entries {
            let _resubscribe = entry.serialize();
            if entry.shutdown_worker() {
                detached += 1;
            }
        }
        if detached > 0 {
            info!(subscribers = detached, "subscribers detached");
        }
    }

    /// `true` iff the supervisor is active and no subscriber is terminated.
    pub fn is_healthy(&self) -> bool {
        self.inner.is_healthy()
    }
}

impl<B> Drop for SubscribersSupervisor<B> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
