//! Shared helpers for the integration tests

#![allow(dead_code)]

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use fishbridge_core::{
    EngineEvent, InfoSink, MoveCodec, SearchEngine, SearchJob, SearchLimits, SearchOutcome,
    SearchSignals,
};
use parking_lot::Mutex;
use proptest::sample::Index;
use shakmaty::{Chess, Position};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const T_CONCLUSION: Duration = Duration::from_secs(10);
pub const T_SHORT: Duration = Duration::from_millis(100);

/// Observer that forwards every event line into a channel
pub fn recorder() -> (impl Fn(&EngineEvent) + Send + Sync, Receiver<String>) {
    let (tx, rx) = unbounded();
    let sink = move |event: &EngineEvent| {
        let _ = tx.send(event.to_string());
    };
    (sink, rx)
}

/// Wait for the next `bestmove` line, returning it.
pub fn wait_for_bestmove(rx: &Receiver<String>, timeout: Duration) -> Result<String, String> {
    let deadline = Instant::now() + timeout;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok(line) if line.starts_with("bestmove") => return Ok(line),
            Ok(_) => continue,
            Err(RecvTimeoutError::Timeout) => return Err("Timeout waiting for bestmove".into()),
            Err(RecvTimeoutError::Disconnected) => return Err("Channel closed".into()),
        }
    }
}

/// Drain everything currently queued.
pub fn drain(rx: &Receiver<String>) -> Vec<String> {
    rx.try_iter().collect()
}

/// Engine that emits one info line and then searches until stopped.
///
/// `searches` counts how many searches were started.
#[derive(Default)]
pub struct ScriptedEngine {
    pub searches: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let searches = Arc::new(AtomicUsize::new(0));
        (
            Self {
                searches: Arc::clone(&searches),
            },
            searches,
        )
    }
}

impl SearchEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn search(
        &mut self,
        job: &SearchJob,
        signals: &SearchSignals,
        info: InfoSink<'_>,
    ) -> SearchOutcome {
        self.searches.fetch_add(1, Ordering::SeqCst);
        info(format!("info string scripted search {}", job.search_id));
        while !signals.stop_requested() {
            thread::sleep(Duration::from_millis(2));
        }
        let moves = job.position.legal_moves();
        let best = if job.limits.root_moves.is_empty() {
            moves.first().cloned()
        } else {
            job.limits.root_moves.first().cloned()
        };
        SearchOutcome {
            best_move: best,
            ponder_move: None,
        }
    }
}

/// Engine that answers at once with the first legal move.
pub struct InstantEngine;

impl SearchEngine for InstantEngine {
    fn name(&self) -> &str {
        "instant"
    }

    fn search(&mut self, job: &SearchJob, _: &SearchSignals, _: InfoSink<'_>) -> SearchOutcome {
        let moves = job.position.legal_moves();
        SearchOutcome {
            best_move: moves.first().cloned(),
            ponder_move: moves.get(1).cloned(),
        }
    }
}

/// Engine that answers at once and keeps the limits of every job it got.
pub struct RecordingEngine {
    pub seen: Arc<Mutex<Vec<SearchLimits>>>,
}

impl RecordingEngine {
    pub fn new() -> (Self, Arc<Mutex<Vec<SearchLimits>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                seen: Arc::clone(&seen),
            },
            seen,
        )
    }
}

impl SearchEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn search(&mut self, job: &SearchJob, _: &SearchSignals, _: InfoSink<'_>) -> SearchOutcome {
        self.seen.lock().push(job.limits.clone());
        SearchOutcome {
            best_move: job.position.legal_moves().first().cloned(),
            ponder_move: None,
        }
    }
}

/// Play a random game from the start position, returning the coordinate
/// moves and the final position.
pub fn random_playout(picks: &[Index]) -> (Vec<String>, Chess) {
    let codec = MoveCodec::default();
    let mut pos = Chess::default();
    let mut moves = Vec::new();
    for pick in picks {
        let legal = pos.legal_moves();
        if legal.is_empty() {
            break;
        }
        let m = legal[pick.index(legal.len())].clone();
        moves.push(codec.to_coordinate(&m));
        pos.play_unchecked(&m);
    }
    (moves, pos)
}
