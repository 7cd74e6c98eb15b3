//! Observer registry and the search-concluded signal.
//!
//! Delivery happens on the publishing thread (normally the engine worker).
//! The registry lock is only held long enough to snapshot the sink list; each
//! sink then has its own reentrant gate that is held while it runs. Removing a
//! sink takes that gate before retiring the entry, so a sink never receives
//! an event after [`ObserverHub::unregister`] returned, and a sink may remove
//! itself (or any other sink) from inside its own callback.

use crate::event::EngineEvent;
use parking_lot::{Condvar, Mutex, ReentrantMutex};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Receiver of engine events
pub trait Observer: Send + Sync {
    fn notify(&self, event: &EngineEvent);
}

impl<F> Observer for F
where
    F: Fn(&EngineEvent) + Send + Sync,
{
    fn notify(&self, event: &EngineEvent) {
        self(event)
    }
}

/// Handle returned by [`ObserverHub::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

struct Entry {
    id: ObserverId,
    sink: Arc<dyn Observer>,
    gate: ReentrantMutex<()>,
    retired: AtomicBool,
}

/// Thread-safe fan-out of [`EngineEvent`]s.
pub struct ObserverHub {
    entries: Mutex<Vec<Arc<Entry>>>,
    next_id: AtomicU64,
    concluded: Mutex<u64>,
    concluded_cv: Condvar,
}

impl Default for ObserverHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverHub {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            concluded: Mutex::new(0),
            concluded_cv: Condvar::new(),
        }
    }

    /// Add a sink. It receives every event published after this call returns.
    pub fn register<O: Observer + 'static>(&self, sink: O) -> ObserverId {
        self.register_arc(Arc::new(sink))
    }

    pub fn register_arc(&self, sink: Arc<dyn Observer>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().push(Arc::new(Entry {
            id,
            sink,
            gate: ReentrantMutex::new(()),
            retired: AtomicBool::new(false),
        }));
        log::debug!("Observer {} registered", id.0);
        id
    }

    /// Remove a sink. Unknown ids are ignored.
    ///
    /// Waits for a delivery to this sink that is in flight on another thread.
    pub fn unregister(&self, id: ObserverId) {
        let removed = {
            let mut entries = self.entries.lock();
            entries
                .iter()
                .position(|e| e.id == id)
                .map(|idx| entries.remove(idx))
        };

        match removed {
            Some(entry) => {
                let _gate = entry.gate.lock();
                entry.retired.store(true, Ordering::Release);
                log::debug!("Observer {} unregistered", id.0);
            }
            None => log::debug!("Observer {} not registered, ignoring removal", id.0),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every registered sink in registration order.
    ///
    /// A panicking sink is logged and skipped. For a
    /// [`EngineEvent::SearchConcluded`] event the conclusion counter is
    /// bumped after all sinks ran and waiters are released.
    pub fn publish(&self, event: &EngineEvent) {
        let snapshot: Vec<Arc<Entry>> = self.entries.lock().clone();

        for entry in snapshot {
            let _gate = entry.gate.lock();
            if entry.retired.load(Ordering::Acquire) {
                continue;
            }
            let sink = Arc::clone(&entry.sink);
            if catch_unwind(AssertUnwindSafe(|| sink.notify(event))).is_err() {
                log::error!("Observer {} panicked while handling '{event}'", entry.id.0);
            }
        }

        if event.is_conclusion() {
            let mut count = self.concluded.lock();
            *count += 1;
            self.concluded_cv.notify_all();
        }
    }

    /// Number of conclusion events published so far
    pub fn concluded_count(&self) -> u64 {
        *self.concluded.lock()
    }

    /// Block until at least `target` conclusions have been published.
    pub fn wait_for_conclusions(&self, target: u64) {
        let mut count = self.concluded.lock();
        while *count < target {
            self.concluded_cv.wait(&mut count);
        }
    }

    /// Like [`ObserverHub::wait_for_conclusions`] with an upper bound.
    /// Returns false on timeout.
    pub fn wait_for_conclusions_timeout(&self, target: u64, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let mut count = self.concluded.lock();
        while *count < target {
            if self
                .concluded_cv
                .wait_until(&mut count, deadline)
                .timed_out()
            {
                return *count >= target;
            }
        }
        true
    }
}
