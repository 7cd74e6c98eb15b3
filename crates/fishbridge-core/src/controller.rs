//! Search lifecycle: `go`, `ponderhit` and the blocking `stop`.
//!
//! ```text
//!            go                     ponderhit
//!   Idle ----------> Thinking <-------------- Pondering
//!    ^  \                |                        |
//!    |   `---------------+------------------------'
//!    |     go ponder     | stop / search done     | stop
//!    |                   v                        |
//!    `------------- Stopping <--------------------'
//!      conclusion
//! ```
//!
//! `go`, `ponderhit` and `stop` are serialised by one control lock held for
//! the whole call, including the wait for the conclusion. The session state
//! lives behind a second lock that is never held while waiting, so the worker
//! thread can always publish its result and mark the session idle, and
//! [`SearchController::state`] never blocks on a running search.
//!
//! Observers run on the search thread. They may read the state but must not
//! call `go`, `ponderhit` or `stop`: a concurrent `stop` holds the control
//! lock until the conclusion that observer is delivering has been published.

use crate::book::PolyglotBook;
use crate::codec::MoveCodec;
use crate::config::PonderhitWhenIdle;
use crate::engine::{SearchEngine, SearchJob, SearchOutcome, SearchSignals};
use crate::error::{BridgeError, BridgeResult};
use crate::event::EngineEvent;
use crate::limits::{ClockSettings, GoParams, SearchLimits};
use crate::observer::ObserverHub;
use crate::options::OptionRegistry;
use crate::position::PositionState;
use parking_lot::Mutex;
use shakmaty::{CastlingMode, Move, Position};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Search state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// No search is active
    Idle,
    /// Search is running on the clock
    Thinking,
    /// Search is running on the opponent's time
    Pondering,
    /// Stop has been requested but the conclusion has not arrived yet
    Stopping,
}

impl SearchState {
    pub fn is_searching(&self) -> bool {
        !matches!(self, SearchState::Idle)
    }
}

/// Start position, moves and limits of one search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoRequest {
    pub fen: String,
    pub moves: Vec<String>,
    pub params: GoParams,
}

impl GoRequest {
    pub fn new(fen: impl Into<String>, moves: &[&str]) -> Self {
        Self {
            fen: fen.into(),
            moves: moves.iter().map(|m| m.to_string()).collect(),
            params: GoParams::default(),
        }
    }

    pub fn with_params(mut self, params: GoParams) -> Self {
        self.params = params;
        self
    }
}

/// Inputs to a search that come from options and configuration
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub options: OptionRegistry,
    pub castling: CastlingMode,
    pub clock: ClockSettings,
    /// Consulted before searching when set
    pub book: Option<Arc<PolyglotBook>>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            options: OptionRegistry::with_defaults(),
            castling: CastlingMode::Standard,
            clock: ClockSettings::default(),
            book: None,
        }
    }
}

struct Session {
    state: SearchState,
    search_id: u64,
    /// Hub conclusion count that marks the current search as concluded
    conclusion_target: u64,
    signals: Option<Arc<SearchSignals>>,
    worker: Option<JoinHandle<()>>,
}

type SharedEngine = Arc<Mutex<Box<dyn SearchEngine>>>;

/// Drives one engine through consecutive searches.
pub struct SearchController {
    hub: Arc<ObserverHub>,
    engine: SharedEngine,
    control: Mutex<()>,
    session: Arc<Mutex<Session>>,
    ponderhit_when_idle: PonderhitWhenIdle,
}

impl SearchController {
    pub fn new(
        hub: Arc<ObserverHub>,
        engine: Box<dyn SearchEngine>,
        ponderhit_when_idle: PonderhitWhenIdle,
    ) -> Self {
        Self {
            hub,
            engine: Arc::new(Mutex::new(engine)),
            control: Mutex::new(()),
            session: Arc::new(Mutex::new(Session {
                state: SearchState::Idle,
                search_id: 0,
                conclusion_target: 0,
                signals: None,
                worker: None,
            })),
            ponderhit_when_idle,
        }
    }

    pub fn state(&self) -> SearchState {
        self.session.lock().state
    }

    /// Id of the most recently started search (0 before the first one)
    pub fn search_id(&self) -> u64 {
        self.session.lock().search_id
    }

    /// Start a search, superseding any running one.
    ///
    /// Returns once the worker is running; results arrive through the hub.
    /// On error no search is started and the controller is idle.
    pub fn go(&self, request: &GoRequest, settings: &SearchSettings) -> BridgeResult<()> {
        request.params.validate()?;
        let _control = self.control.lock();
        self.stop_locked();

        let state = PositionState::build(&request.fen, &request.moves, settings.castling)
            .map_err(|e| {
                log::info!("go rejected: {e}");
                e
            })?;
        if state.is_threefold_repetition() {
            log::info!("Search root already occurred three times");
        }
        let job = self.prepare_job(&state, request, settings);
        let signals = Arc::new(SearchSignals::new(job.limits.ponder));
        let next_state = if job.limits.ponder {
            SearchState::Pondering
        } else {
            SearchState::Thinking
        };

        let search_id = {
            let mut session = self.session.lock();
            session.search_id += 1;
            session.conclusion_target = self.hub.concluded_count() + 1;
            session.state = next_state;
            session.signals = Some(Arc::clone(&signals));
            session.search_id
        };
        let job = SearchJob { search_id, ..job };

        let worker = SearchWorker {
            hub: Arc::clone(&self.hub),
            engine: Arc::clone(&self.engine),
            session: Arc::clone(&self.session),
            signals,
            codec: *state.codec(),
            book: settings.book.clone(),
            job,
        };
        match thread::Builder::new()
            .name(format!("search-{search_id}"))
            .spawn(move || worker.run())
        {
            Ok(handle) => {
                let mut session = self.session.lock();
                session.worker = Some(handle);
                log::debug!("Search {search_id} started ({next_state:?})");
                Ok(())
            }
            Err(e) => {
                let mut session = self.session.lock();
                session.state = SearchState::Idle;
                session.signals = None;
                log::error!("Search {search_id} could not start: {e}");
                Err(BridgeError::Spawn(e))
            }
        }
    }

    fn prepare_job(
        &self,
        state: &PositionState,
        request: &GoRequest,
        settings: &SearchSettings,
    ) -> SearchJob {
        let position = state.position().clone();
        let mut limits =
            SearchLimits::from_params(&request.params, position.turn(), settings.clock);
        limits.root_moves = restrict_root(state, &request.params.searchmoves);

        let window = position.halfmoves() as usize;
        let keys: Vec<u64> = state.history().map(|r| r.key).collect();
        let history = keys[keys.len().saturating_sub(window)..].to_vec();

        SearchJob {
            search_id: 0,
            position,
            history,
            limits,
            options: settings.options.clone(),
        }
    }

    /// The predicted move was played.
    ///
    /// While pondering this either turns the search into a timed one or, if
    /// the engine has nothing left to search, concludes it like `stop`.
    pub fn ponderhit(&self) -> BridgeResult<()> {
        let _control = self.control.lock();
        let signals = {
            let session = self.session.lock();
            match session.state {
                SearchState::Pondering => session.signals.clone(),
                SearchState::Thinking => {
                    log::debug!("ponderhit ignored, search {} not pondering", session.search_id);
                    return Ok(());
                }
                SearchState::Idle | SearchState::Stopping => None,
            }
        };

        let Some(signals) = signals else {
            return match self.ponderhit_when_idle {
                PonderhitWhenIdle::Ignore => {
                    log::debug!("ponderhit ignored while idle");
                    Ok(())
                }
                PonderhitWhenIdle::Reject => Err(BridgeError::NotPondering),
            };
        };

        if signals.stop_on_ponderhit() {
            log::debug!("ponderhit on finished ponder search, stopping");
            self.stop_locked();
            return Ok(());
        }

        signals.ponderhit();
        let mut session = self.session.lock();
        if session.state == SearchState::Pondering {
            session.state = SearchState::Thinking;
            log::debug!("Search {} switched to thinking", session.search_id);
        }
        Ok(())
    }

    /// Stop the running search and block until its conclusion was published.
    /// Does nothing when idle.
    pub fn stop(&self) {
        let _control = self.control.lock();
        self.stop_locked();
    }

    fn stop_locked(&self) {
        let (target, worker, search_id) = {
            let mut session = self.session.lock();
            if session.state == SearchState::Idle {
                let worker = session.worker.take();
                drop(session);
                join_worker(worker);
                return;
            }
            session.state = SearchState::Stopping;
            if let Some(signals) = &session.signals {
                signals.request_stop();
            }
            (
                session.conclusion_target,
                session.worker.take(),
                session.search_id,
            )
        };

        log::debug!("Stopping search {search_id}");
        self.hub.wait_for_conclusions(target);
        join_worker(worker);

        let mut session = self.session.lock();
        session.state = SearchState::Idle;
        session.signals = None;
        log::debug!("Search {search_id} stopped");
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn join_worker(worker: Option<JoinHandle<()>>) {
    if let Some(handle) = worker {
        if handle.join().is_err() {
            log::error!("Search thread panicked");
        }
    }
}

/// Resolve `searchmoves`; unparsable entries are dropped and an empty
/// result means no restriction.
fn restrict_root(state: &PositionState, searchmoves: &[String]) -> Vec<Move> {
    let mut root = Vec::with_capacity(searchmoves.len());
    for text in searchmoves {
        match state.codec().parse(state.position(), text) {
            Ok(m) if !root.contains(&m) => root.push(m),
            Ok(_) => {}
            Err(_) => log::debug!("Dropping unplayable search move {text}"),
        }
    }
    if root.is_empty() && !searchmoves.is_empty() {
        log::warn!("No playable search moves, searching all moves");
    }
    root
}

struct SearchWorker {
    hub: Arc<ObserverHub>,
    engine: SharedEngine,
    session: Arc<Mutex<Session>>,
    signals: Arc<SearchSignals>,
    codec: MoveCodec,
    book: Option<Arc<PolyglotBook>>,
    job: SearchJob,
}

impl SearchWorker {
    fn run(self) {
        let mut guard = ConclusionGuard {
            hub: Arc::clone(&self.hub),
            session: Arc::clone(&self.session),
            search_id: self.job.search_id,
            published: false,
        };

        let outcome = match self.book_move() {
            Some(best) => {
                let text = self.codec.to_coordinate(&best);
                self.hub.publish(&EngineEvent::info_string(format!("book move {text}")));
                SearchOutcome {
                    best_move: Some(best),
                    ponder_move: None,
                }
            }
            None => {
                let hub = &self.hub;
                let info = |line: String| hub.publish(&EngineEvent::Info(line));
                let mut engine = self.engine.lock();
                engine.configure(&self.job.options);
                engine.search(&self.job, &self.signals, &info)
            }
        };

        self.signals.wait_for_release(self.job.limits.infinite);

        let best = outcome.best_move.as_ref().map(|m| self.codec.to_coordinate(m));
        let ponder = outcome.ponder_move.as_ref().map(|m| self.codec.to_coordinate(m));
        guard.conclude(EngineEvent::concluded(best, ponder));
    }

    fn book_move(&self) -> Option<Move> {
        let book = self.book.as_ref()?;
        book.best_move(&self.job.position, &self.codec, &self.job.limits.root_moves)
    }
}

/// Publishes exactly one conclusion per search, also when the engine panics,
/// and marks the session idle afterwards.
struct ConclusionGuard {
    hub: Arc<ObserverHub>,
    session: Arc<Mutex<Session>>,
    search_id: u64,
    published: bool,
}

impl ConclusionGuard {
    fn conclude(&mut self, event: EngineEvent) {
        if self.published {
            return;
        }
        self.published = true;
        log::debug!("Search {} concluded: {event}", self.search_id);
        self.hub.publish(&event);
    }
}

impl Drop for ConclusionGuard {
    fn drop(&mut self) {
        if !self.published {
            log::error!("Search {} ended without a result", self.search_id);
            self.conclude(EngineEvent::concluded(None, None));
        }
        let mut session = self.session.lock();
        if session.search_id == self.search_id && session.state != SearchState::Idle {
            session.state = SearchState::Idle;
            session.signals = None;
        }
    }
}
