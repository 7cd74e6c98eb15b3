//! Error types for the bridge.
//!
//! Every fallible operation of the crate reports a [`BridgeError`]. None of
//! them leaves shared state half-modified, with the documented exception of
//! [`PositionState::build`](crate::position::PositionState::build), whose
//! [`BuildError`] carries the moves applied before the failing token.

use crate::position::PositionState;
use std::path::PathBuf;

/// Bridge errors
#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    /// A move token could not be matched against the legal moves of the position
    #[error("Invalid move: {text}")]
    InvalidMove { text: String },

    /// A start position could not be parsed or describes an illegal setup
    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    /// No option with that name is registered
    #[error("Unknown option: {name}")]
    UnknownOption { name: String },

    /// The value does not fit the option's type or bounds
    #[error("Invalid value '{value}' for option {name}: {reason}")]
    InvalidOptionValue {
        name: String,
        value: String,
        reason: String,
    },

    /// Malformed argument shape (missing value, wrong type, unknown keyword)
    #[error("Parameter validation failed: {0}")]
    ParameterValidation(String),

    /// `ponderhit` received while no ponder search is running
    #[error("ponderhit received while not pondering")]
    NotPondering,

    /// Opening book could not be read
    #[error("Failed to read opening book {path:?}: {source}")]
    Book {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be loaded
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The search thread could not be spawned
    #[error("Failed to start search thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl BridgeError {
    pub(crate) fn invalid_move(text: impl Into<String>) -> Self {
        BridgeError::InvalidMove { text: text.into() }
    }

    pub(crate) fn invalid_value(
        name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        BridgeError::InvalidOptionValue {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the caller's input rather than by I/O
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            BridgeError::Book { .. } | BridgeError::Config(_) | BridgeError::Spawn(_)
        )
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Failure of [`PositionState::build`].
#[derive(thiserror::Error, Debug)]
#[error("{source}")]
pub struct BuildError {
    /// Position after the moves applied before the failure; `None` when the
    /// start FEN itself was rejected
    pub partial: Option<Box<PositionState>>,
    pub source: BridgeError,
}

impl From<BuildError> for BridgeError {
    fn from(e: BuildError) -> Self {
        e.source
    }
}
