//! `go` parameters and the search limits derived from them.

use crate::error::{BridgeError, BridgeResult};
use shakmaty::{Color, Move};
use std::time::Duration;

/// Parameters of a `go` request, as sent by the caller.
///
/// Every field is optional; an unset limit means unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    /// Restrict the root to these coordinate moves
    pub searchmoves: Vec<String>,

    /// White time in milliseconds
    pub wtime: Option<u64>,

    /// Black time in milliseconds
    pub btime: Option<u64>,

    /// White increment in milliseconds
    pub winc: Option<u64>,

    /// Black increment in milliseconds
    pub binc: Option<u64>,

    /// Moves until next time control
    pub movestogo: Option<u32>,

    /// Maximum search depth
    pub depth: Option<u32>,

    /// Maximum nodes to search
    pub nodes: Option<u64>,

    /// Fixed time per move in milliseconds
    pub movetime: Option<u64>,

    /// Search for a mate in this many moves
    pub mate: Option<u32>,

    /// Search until stopped
    pub infinite: bool,

    /// Ponder mode (think on opponent's time)
    pub ponder: bool,
}

const KEYWORDS: &[&str] = &[
    "searchmoves",
    "wtime",
    "btime",
    "winc",
    "binc",
    "movestogo",
    "depth",
    "nodes",
    "movetime",
    "mate",
    "infinite",
    "ponder",
];

fn value<T: std::str::FromStr>(parts: &[&str], i: usize, key: &str) -> BridgeResult<T> {
    let raw = parts
        .get(i)
        .ok_or_else(|| BridgeError::ParameterValidation(format!("go {key} requires a value")))?;
    raw.parse()
        .map_err(|_| BridgeError::ParameterValidation(format!("Invalid {key} value: {raw}")))
}

impl GoParams {
    /// Parse the tokens following `go`.
    pub fn parse(parts: &[&str]) -> BridgeResult<Self> {
        let mut params = GoParams::default();
        let mut i = 0;

        while i < parts.len() {
            let key = parts[i];
            match key {
                "ponder" => params.ponder = true,
                "infinite" => params.infinite = true,
                "searchmoves" => {
                    while i + 1 < parts.len() && !KEYWORDS.contains(&parts[i + 1]) {
                        i += 1;
                        params.searchmoves.push(parts[i].to_string());
                    }
                }
                "wtime" => {
                    i += 1;
                    params.wtime = Some(value(parts, i, key)?);
                }
                "btime" => {
                    i += 1;
                    params.btime = Some(value(parts, i, key)?);
                }
                "winc" => {
                    i += 1;
                    params.winc = Some(value(parts, i, key)?);
                }
                "binc" => {
                    i += 1;
                    params.binc = Some(value(parts, i, key)?);
                }
                "movestogo" => {
                    i += 1;
                    params.movestogo = Some(value(parts, i, key)?);
                }
                "depth" => {
                    i += 1;
                    params.depth = Some(value(parts, i, key)?);
                }
                "nodes" => {
                    i += 1;
                    params.nodes = Some(value(parts, i, key)?);
                }
                "movetime" => {
                    i += 1;
                    params.movetime = Some(value(parts, i, key)?);
                }
                "mate" => {
                    i += 1;
                    params.mate = Some(value(parts, i, key)?);
                }
                other => {
                    return Err(BridgeError::ParameterValidation(format!(
                        "Unknown go parameter: {other}"
                    )))
                }
            }
            i += 1;
        }

        params.validate()?;
        Ok(params)
    }

    /// Reject parameter combinations no search can honour.
    pub fn validate(&self) -> BridgeResult<()> {
        if self.movestogo == Some(0) {
            return Err(BridgeError::ParameterValidation(
                "movestogo must be at least 1".to_string(),
            ));
        }
        if self.depth == Some(0) {
            return Err(BridgeError::ParameterValidation(
                "depth must be at least 1".to_string(),
            ));
        }
        if self.mate == Some(0) {
            return Err(BridgeError::ParameterValidation(
                "mate must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Clock settings taken from the option table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSettings {
    pub move_overhead: Duration,
    pub minimum_thinking_time: Duration,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            move_overhead: Duration::from_millis(30),
            minimum_thinking_time: Duration::from_millis(20),
        }
    }
}

/// Limits handed to the engine for one search.
///
/// The caller's fields are passed through unchanged; unset means no
/// constraint. `optimum_time` and `maximum_time` are budgets derived from the
/// clock of the side to move and the option table.
#[derive(Debug, Clone, Default)]
pub struct SearchLimits {
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movestogo: Option<u32>,
    pub movetime: Option<u64>,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub mate: Option<u32>,
    /// Soft budget: do not start a new iteration after it
    pub optimum_time: Option<Duration>,
    /// Hard budget: abort the running iteration
    pub maximum_time: Option<Duration>,
    pub infinite: bool,
    pub ponder: bool,
    /// Empty means all legal moves
    pub root_moves: Vec<Move>,
}

impl SearchLimits {
    /// Copy the caller's limits and derive budgets for the side to move.
    pub fn from_params(params: &GoParams, side: Color, clock: ClockSettings) -> Self {
        let mut limits = SearchLimits {
            wtime: params.wtime,
            btime: params.btime,
            winc: params.winc,
            binc: params.binc,
            movestogo: params.movestogo,
            movetime: params.movetime,
            depth: params.depth,
            nodes: params.nodes,
            mate: params.mate,
            infinite: params.infinite,
            ponder: params.ponder,
            ..Default::default()
        };

        if let Some(movetime) = params.movetime {
            let budget = Duration::from_millis(movetime)
                .saturating_sub(clock.move_overhead)
                .max(clock.minimum_thinking_time);
            limits.optimum_time = Some(budget);
            limits.maximum_time = Some(budget);
        } else {
            let (remaining, increment) = match side {
                Color::White => (params.wtime, params.winc),
                Color::Black => (params.btime, params.binc),
            };
            if let Some(remaining) = remaining {
                let (optimum, maximum) = allocate(
                    Duration::from_millis(remaining),
                    Duration::from_millis(increment.unwrap_or(0)),
                    params.movestogo,
                    clock,
                );
                limits.optimum_time = Some(optimum);
                limits.maximum_time = Some(maximum);
            }
        }

        limits
    }

    /// True when nothing would ever end the search on its own
    pub fn is_unbounded(&self) -> bool {
        self.depth.is_none()
            && self.nodes.is_none()
            && self.mate.is_none()
            && self.movetime.is_none()
            && self.wtime.is_none()
            && self.btime.is_none()
            && !self.infinite
    }
}

/// Split the remaining clock into a soft and a hard budget for one move.
fn allocate(
    remaining: Duration,
    increment: Duration,
    movestogo: Option<u32>,
    clock: ClockSettings,
) -> (Duration, Duration) {
    let moves_left = movestogo.unwrap_or(30).clamp(1, 50);
    let usable = remaining.saturating_sub(clock.move_overhead);

    let optimum = (usable / moves_left + increment * 3 / 4)
        .min(usable / 2)
        .max(clock.minimum_thinking_time);
    let maximum = (optimum * 4)
        .min(usable * 4 / 5)
        .max(optimum);

    (optimum, maximum)
}
