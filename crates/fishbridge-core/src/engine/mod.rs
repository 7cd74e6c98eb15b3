//! Search engine interface.
//!
//! The bridge never looks inside a search. It hands a [`SearchJob`] to a
//! [`SearchEngine`] on a worker thread, steers it through [`SearchSignals`]
//! and turns the returned [`SearchOutcome`] into a conclusion event.

pub mod material;
pub mod time;

use crate::limits::SearchLimits;
use crate::options::OptionRegistry;
use parking_lot::{Condvar, Mutex};
use shakmaty::{Chess, Move};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

pub use material::MaterialEngine;

/// Everything an engine needs for one search
#[derive(Debug, Clone)]
pub struct SearchJob {
    pub search_id: u64,
    pub position: Chess,
    /// Polyglot keys of the positions before `position`, oldest first,
    /// limited to the current fifty-move window
    pub history: Vec<u64>,
    pub limits: SearchLimits,
    /// Option values at the time the search was started
    pub options: OptionRegistry,
}

/// Result of one search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    pub best_move: Option<Move>,
    pub ponder_move: Option<Move>,
}

/// Sink for `info` lines produced during a search
pub type InfoSink<'a> = &'a (dyn Fn(String) + Sync);

/// A search algorithm the bridge can drive.
pub trait SearchEngine: Send {
    fn name(&self) -> &str;

    /// Apply option values before a search. Called on the worker thread.
    fn configure(&mut self, _options: &OptionRegistry) {}

    /// Run one search. Must return promptly once `signals.stop_requested()`
    /// turns true. Waiting for `stop` or `ponderhit` after the search is done
    /// is handled by the caller.
    fn search(
        &mut self,
        job: &SearchJob,
        signals: &SearchSignals,
        info: InfoSink<'_>,
    ) -> SearchOutcome;
}

impl<E: SearchEngine + ?Sized> SearchEngine for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn configure(&mut self, options: &OptionRegistry) {
        (**self).configure(options)
    }

    fn search(
        &mut self,
        job: &SearchJob,
        signals: &SearchSignals,
        info: InfoSink<'_>,
    ) -> SearchOutcome {
        (**self).search(job, signals, info)
    }
}

/// Flags shared between the controller and a running search.
pub struct SearchSignals {
    stop: AtomicBool,
    pondering: AtomicBool,
    stop_on_ponderhit: AtomicBool,
    /// Set on ponderhit; time budgets count from here instead of the start
    clock_start: Mutex<Instant>,
    release: Mutex<()>,
    release_cv: Condvar,
}

impl SearchSignals {
    pub fn new(ponder: bool) -> Self {
        Self {
            stop: AtomicBool::new(false),
            pondering: AtomicBool::new(ponder),
            stop_on_ponderhit: AtomicBool::new(false),
            clock_start: Mutex::new(Instant::now()),
            release: Mutex::new(()),
            release_cv: Condvar::new(),
        }
    }

    pub fn request_stop(&self) {
        let _guard = self.release.lock();
        self.stop.store(true, Ordering::Release);
        self.release_cv.notify_all();
    }

    #[inline]
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_pondering(&self) -> bool {
        self.pondering.load(Ordering::Acquire)
    }

    /// The predicted move was played: switch to a normal timed search.
    pub fn ponderhit(&self) {
        let _guard = self.release.lock();
        *self.clock_start.lock() = Instant::now();
        self.pondering.store(false, Ordering::Release);
        self.release_cv.notify_all();
    }

    /// Mark that the ponder search has nothing left to do, so a ponderhit
    /// should conclude it at once.
    pub fn set_stop_on_ponderhit(&self) {
        self.stop_on_ponderhit.store(true, Ordering::Release);
    }

    pub fn stop_on_ponderhit(&self) -> bool {
        self.stop_on_ponderhit.load(Ordering::Acquire)
    }

    /// Instant the time budget counts from
    pub fn clock_start(&self) -> Instant {
        *self.clock_start.lock()
    }

    /// Block while the search may not conclude yet: until stopped, or, for a
    /// ponder search, until ponderhit. `infinite` searches wait for stop only.
    pub fn wait_for_release(&self, infinite: bool) {
        let mut guard = self.release.lock();
        if self.is_pondering() {
            self.set_stop_on_ponderhit();
        }
        while !self.stop_requested() && (infinite || self.is_pondering()) {
            self.release_cv.wait(&mut guard);
        }
    }
}
