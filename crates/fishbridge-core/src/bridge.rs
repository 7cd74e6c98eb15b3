//! The public face of the crate: one [`Bridge`] per engine session.

use crate::book::{BookEntry, PolyglotBook};
use crate::config::BridgeConfig;
use crate::controller::{GoRequest, SearchController, SearchSettings, SearchState};
use crate::engine::{MaterialEngine, SearchEngine};
use crate::error::{BridgeError, BridgeResult};
use crate::limits::ClockSettings;
use crate::observer::{Observer, ObserverHub, ObserverId};
use crate::options::{self, EngineOption, OptionRegistry};
use crate::position::{self, PositionState};
use parking_lot::{Mutex, RwLock};
use shakmaty::CastlingMode;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Translation helpers, option storage and search control for one engine.
///
/// Dropping a bridge stops a running search and joins its thread.
pub struct Bridge {
    config: BridgeConfig,
    options: RwLock<OptionRegistry>,
    book: Mutex<Option<Arc<PolyglotBook>>>,
    hub: Arc<ObserverHub>,
    controller: SearchController,
}

impl Bridge {
    /// Bridge driving the built-in [`MaterialEngine`], which searches
    /// `config.default_depth` plies when a `go` carries no limit.
    pub fn new(config: BridgeConfig) -> BridgeResult<Self> {
        let engine = MaterialEngine::new().with_default_depth(config.default_depth);
        Self::with_engine(config, Box::new(engine))
    }

    pub fn with_engine(config: BridgeConfig, engine: Box<dyn SearchEngine>) -> BridgeResult<Self> {
        let mut registry = OptionRegistry::with_defaults();
        for (name, value) in config.option_values() {
            registry.set(name, &value)?;
        }

        let hub = Arc::new(ObserverHub::new());
        log::info!("Engine '{}' attached", engine.name());
        let controller =
            SearchController::new(Arc::clone(&hub), engine, config.ponderhit_when_idle);

        let bridge = Self {
            config,
            options: RwLock::new(registry),
            book: Mutex::new(None),
            hub,
            controller,
        };
        if bridge.own_book() {
            bridge.current_book()?;
        }
        Ok(bridge)
    }

    /// Engine identification line
    pub fn info(&self) -> String {
        format!(
            "{} {} by the fishbridge developers",
            self.config.engine_name,
            env!("CARGO_PKG_VERSION")
        )
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// All options in registration order.
    pub fn get_options(&self) -> Vec<EngineOption> {
        self.options.read().snapshot()
    }

    /// Set an option. Values are validated against the option's type and
    /// domain; a rejected value leaves the option unchanged.
    pub fn set_option(&self, name: &str, value: impl fmt::Display) -> BridgeResult<()> {
        let raw = value.to_string();
        self.options.write().set(name, &raw).map_err(|e| {
            log::debug!("setoption {name} rejected: {e}");
            e
        })
    }

    pub fn add_observer<O: Observer + 'static>(&self, sink: O) -> ObserverId {
        self.hub.register(sink)
    }

    /// Removing an unknown or already removed id does nothing.
    pub fn remove_observer(&self, id: ObserverId) {
        self.hub.unregister(id)
    }

    fn castling_mode(&self) -> CastlingMode {
        if self.options.read().check(options::CHESS960).unwrap_or(false) {
            CastlingMode::Chess960
        } else {
            CastlingMode::Standard
        }
    }

    fn own_book(&self) -> bool {
        self.options.read().check(options::OWN_BOOK).unwrap_or(false)
    }

    /// Legal moves of `fen` in coordinate notation, in generation order.
    pub fn legal_moves(&self, fen: &str) -> BridgeResult<Vec<String>> {
        let state = PositionState::new(fen, self.castling_mode())?;
        let codec = state.codec();
        Ok(state
            .legal_moves()
            .iter()
            .map(|m| codec.to_coordinate(m))
            .collect())
    }

    /// FEN after replaying `moves` from `fen`. Moves that are not legal where
    /// they occur are skipped.
    pub fn get_fen<S: AsRef<str>>(&self, fen: &str, moves: &[S]) -> BridgeResult<String> {
        Ok(PositionState::build_lenient(fen, moves, self.castling_mode())?.fen())
    }

    /// FEN of the position after `moves`, mirrored with colours swapped.
    /// Moves are replayed as in [`Bridge::get_fen`].
    pub fn flip<S: AsRef<str>>(&self, fen: &str, moves: &[S]) -> BridgeResult<String> {
        let mode = self.castling_mode();
        let state = PositionState::build_lenient(fen, moves, mode)?;
        Ok(position::to_fen(&position::flip(state.position(), mode)?))
    }

    /// Polyglot key of the position after `moves`.
    pub fn key<S: AsRef<str>>(&self, fen: &str, moves: &[S]) -> BridgeResult<u64> {
        Ok(PositionState::build(fen, moves, self.castling_mode())?.key())
    }

    /// Coordinate moves to standard notation.
    pub fn to_san<S: AsRef<str>>(&self, fen: &str, moves: &[S]) -> BridgeResult<Vec<String>> {
        Ok(PositionState::build(fen, moves, self.castling_mode())?.standard_texts())
    }

    /// Standard notation moves to coordinate notation.
    pub fn to_can<S: AsRef<str>>(&self, fen: &str, moves: &[S]) -> BridgeResult<Vec<String>> {
        let mut state = PositionState::new(fen, self.castling_mode())?;
        for text in moves {
            let m = state.codec().from_standard(state.position(), text.as_ref())?;
            state.push(m);
        }
        Ok(state.move_texts())
    }

    /// Start a search. Results arrive through the observers; a running
    /// search is stopped first and its conclusion published.
    pub fn go(&self, request: &GoRequest) -> BridgeResult<()> {
        let settings = self.search_settings();
        self.controller.go(request, &settings)
    }

    pub fn ponderhit(&self) -> BridgeResult<()> {
        self.controller.ponderhit()
    }

    /// Stop the running search and wait for its conclusion.
    pub fn stop(&self) -> BridgeResult<()> {
        self.controller.stop();
        Ok(())
    }

    pub fn state(&self) -> SearchState {
        self.controller.state()
    }

    /// Book moves of the position after `moves`, heaviest first.
    pub fn book_moves<S: AsRef<str>>(
        &self,
        fen: &str,
        moves: &[S],
    ) -> BridgeResult<Vec<(String, BookEntry)>> {
        let state = PositionState::build(fen, moves, self.castling_mode())?;
        let book = self.current_book()?;
        let codec = state.codec();
        Ok(book
            .moves_for(state.position(), codec)
            .into_iter()
            .map(|(m, entry)| (codec.to_coordinate(&m), entry))
            .collect())
    }

    fn book_path(&self) -> PathBuf {
        match &self.config.book_path {
            Some(path) => path.clone(),
            None => PathBuf::from(self.options.read().text(options::BOOK_FILE).unwrap_or_default()),
        }
    }

    /// The book for the configured path, loaded on first use and reloaded
    /// when `Book File` changes.
    fn current_book(&self) -> BridgeResult<Arc<PolyglotBook>> {
        let path = self.book_path();
        let mut cached = self.book.lock();
        if let Some(book) = cached.as_ref() {
            if book.path() == Some(path.as_path()) {
                return Ok(Arc::clone(book));
            }
        }
        if path.as_os_str().is_empty() {
            return Err(BridgeError::Config("no book file configured".to_string()));
        }
        let book = Arc::new(PolyglotBook::open(&path)?);
        *cached = Some(Arc::clone(&book));
        Ok(book)
    }

    fn search_settings(&self) -> SearchSettings {
        let book = if self.own_book() {
            match self.current_book() {
                Ok(book) => Some(book),
                Err(e) => {
                    log::warn!("Opening book unavailable, searching instead: {e}");
                    None
                }
            }
        } else {
            None
        };

        let options = self.options.read().clone();
        let millis = |name: &str, default: i64| {
            Duration::from_millis(options.spin(name).unwrap_or(default).max(0) as u64)
        };
        let clock = ClockSettings {
            move_overhead: millis(options::MOVE_OVERHEAD, 30),
            minimum_thinking_time: millis(options::MINIMUM_THINKING_TIME, 20),
        };

        SearchSettings {
            castling: self.castling_mode(),
            clock,
            book,
            options,
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if self.controller.state().is_searching() {
            log::debug!("Bridge dropped during a search, stopping it");
        }
        self.controller.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::STARTPOS;

    const NO_MOVES: &[&str] = &[];

    #[test]
    fn test_info() {
        let bridge = Bridge::new(BridgeConfig::default()).unwrap();
        let info = bridge.info();
        assert!(info.starts_with("fishbridge "));
        assert!(info.ends_with(" by the fishbridge developers"));
    }

    #[test]
    fn test_config_overrides_applied() {
        let config = BridgeConfig::from_toml_str("[options]\nHash = 64\nContempt = -5").unwrap();
        let bridge = Bridge::new(config).unwrap();
        let hash = bridge
            .get_options()
            .into_iter()
            .find(|o| o.name == options::HASH)
            .unwrap();
        assert_eq!(hash.value.to_string(), "64");
    }

    #[test]
    fn test_bad_override_fails_construction() {
        let config = BridgeConfig::from_toml_str("[options]\nHash = 0").unwrap();
        assert!(matches!(
            Bridge::new(config),
            Err(BridgeError::InvalidOptionValue { .. })
        ));
    }

    #[test]
    fn test_missing_book_with_own_book_fails() {
        let config = BridgeConfig::from_toml_str(
            "book_path = \"/nonexistent/book.bin\"\n[options]\nOwnBook = true",
        )
        .unwrap();
        assert!(matches!(Bridge::new(config), Err(BridgeError::Book { .. })));
    }

    #[test]
    fn test_chess960_castling_notation() {
        let bridge = Bridge::new(BridgeConfig::default()).unwrap();
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        assert!(bridge.legal_moves(fen).unwrap().contains(&"e1g1".to_string()));

        bridge.set_option(options::CHESS960, true).unwrap();
        let moves = bridge.legal_moves(fen).unwrap();
        assert!(moves.contains(&"e1h1".to_string()));
        assert!(!moves.contains(&"e1g1".to_string()));
    }

    #[test]
    fn test_stop_when_idle() {
        let bridge = Bridge::new(BridgeConfig::default()).unwrap();
        bridge.stop().unwrap();
        assert_eq!(bridge.state(), SearchState::Idle);
        assert_eq!(bridge.key(STARTPOS, NO_MOVES).unwrap(), 0x463b96181691fc9c);
    }
}
