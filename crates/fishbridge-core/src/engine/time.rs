//! Stop decisions during a search.

use super::SearchSignals;
use crate::limits::SearchLimits;
use std::time::{Duration, Instant};

/// Nodes between clock reads
const CHECK_INTERVAL: u64 = 1024;

/// Decides when a running search has to give up.
///
/// Time budgets are ignored while pondering and count from the ponderhit
/// afterwards.
pub struct StopCheck<'a> {
    signals: &'a SearchSignals,
    optimum: Option<Duration>,
    maximum: Option<Duration>,
    nodes_limit: Option<u64>,
    started: Instant,
    next_check: u64,
    stopped: bool,
}

impl<'a> StopCheck<'a> {
    pub fn new(limits: &SearchLimits, signals: &'a SearchSignals) -> Self {
        Self {
            signals,
            optimum: limits.optimum_time,
            maximum: limits.maximum_time,
            nodes_limit: limits.nodes,
            started: Instant::now(),
            next_check: 0,
            stopped: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn budget_elapsed(&self) -> Duration {
        self.signals.clock_start().max(self.started).elapsed()
    }

    /// Called once per node. Returns true when the search must unwind.
    #[inline]
    pub fn should_stop(&mut self, nodes: u64) -> bool {
        if self.stopped {
            return true;
        }
        if let Some(limit) = self.nodes_limit {
            if nodes >= limit {
                self.stopped = true;
                return true;
            }
        }
        if nodes < self.next_check {
            return false;
        }
        self.next_check = nodes + CHECK_INTERVAL;

        if self.signals.stop_requested() {
            self.stopped = true;
        } else if let Some(maximum) = self.maximum {
            if !self.signals.is_pondering() && self.budget_elapsed() >= maximum {
                self.stopped = true;
            }
        }
        self.stopped
    }

    /// Between iterations: is there time for another one?
    pub fn can_start_iteration(&self) -> bool {
        if self.stopped || self.signals.stop_requested() {
            return false;
        }
        match self.optimum {
            Some(optimum) if !self.signals.is_pondering() => self.budget_elapsed() < optimum / 2,
            _ => true,
        }
    }

    pub fn was_stopped(&self) -> bool {
        self.stopped
    }
}
