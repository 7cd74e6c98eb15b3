//! Coordination layer between a caller and a chess search engine
//!
//! Move notation and FEN translation, engine options, observer fan-out of
//! engine output and the `go`/`ponderhit`/`stop` search lifecycle.

pub mod book;
pub mod bridge;
pub mod codec;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod event;
pub mod limits;
pub mod observer;
pub mod options;
pub mod position;

pub use bridge::Bridge;
pub use codec::MoveCodec;
pub use config::{BridgeConfig, PonderhitWhenIdle};
pub use controller::{GoRequest, SearchState};
pub use engine::{InfoSink, MaterialEngine, SearchEngine, SearchJob, SearchOutcome, SearchSignals};
pub use error::{BridgeError, BridgeResult, BuildError};
pub use event::EngineEvent;
pub use limits::{GoParams, SearchLimits};
pub use observer::{Observer, ObserverId};
pub use options::{EngineOption, OptionKind, OptionValue};
pub use position::{PositionState, START_FEN, STARTPOS};
