//! Position plus undo history, rebuilt from a start FEN and a move list.

use crate::codec::MoveCodec;
use crate::error::{BridgeError, BridgeResult, BuildError};
use shakmaty::fen::Fen;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{Board, CastlingMode, Chess, EnPassantMode, Move, Piece, Position, Square};

/// FEN of the standard initial position
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Sentinel accepted in place of [`START_FEN`]
pub const STARTPOS: &str = "startpos";

/// Everything needed to take one applied move back.
#[derive(Debug, Clone)]
pub struct UndoRecord {
    /// Polyglot key of the position before the move
    pub key: u64,
    /// The move that was applied
    pub mv: Move,
    prior: Chess,
}

/// A position and the ordered stack of undo records that produced it.
///
/// The stack is private: it grows only through [`PositionState::push`] and
/// shrinks only through [`PositionState::take_back`], so its length always
/// equals the number of moves applied since the start position.
#[derive(Debug, Clone)]
pub struct PositionState {
    position: Chess,
    stack: Vec<UndoRecord>,
    codec: MoveCodec,
}

/// Parse a FEN (or the `startpos` sentinel) into a position.
pub fn parse_fen(fen: &str, mode: CastlingMode) -> BridgeResult<Chess> {
    let text = fen.trim();
    if text == STARTPOS {
        return Ok(Chess::default());
    }
    if text.is_empty() {
        return Err(BridgeError::InvalidFen {
            fen: String::new(),
            reason: "empty FEN".to_string(),
        });
    }

    let parsed: Fen = text.parse().map_err(|e| BridgeError::InvalidFen {
        fen: text.to_string(),
        reason: format!("{e}"),
    })?;
    parsed
        .into_position(mode)
        .map_err(|e| BridgeError::InvalidFen {
            fen: text.to_string(),
            reason: format!("{e}"),
        })
}

/// Serialise a position as FEN.
pub fn to_fen(pos: &Chess) -> String {
    Fen::from_position(pos.clone(), EnPassantMode::Legal).to_string()
}

/// Mirror a position top to bottom with colours and side to move swapped.
///
/// Castling rights and the en passant square are mirrored with the board;
/// move counters are kept. Flipping twice gives back the original position.
pub fn flip(pos: &Chess, mode: CastlingMode) -> BridgeResult<Chess> {
    let mut setup = pos.clone().into_setup(EnPassantMode::Legal);
    let mut board = Board::empty();
    for sq in Square::ALL {
        if let Some(piece) = setup.board.piece_at(sq) {
            let mirrored = Piece {
                color: !piece.color,
                role: piece.role,
            };
            board.set_piece_at(sq.flip_vertical(), mirrored);
        }
    }
    setup.board = board;
    setup.turn = !setup.turn;
    setup.castling_rights = setup.castling_rights.flip_vertical();
    setup.ep_square = setup.ep_square.map(Square::flip_vertical);

    let fen = Fen::from_setup(setup);
    let text = fen.to_string();
    fen.into_position(mode)
        .map_err(|e| BridgeError::InvalidFen {
            fen: text,
            reason: format!("{e}"),
        })
}

/// 64-bit Polyglot-compatible Zobrist key of a position.
pub fn polyglot_key(pos: &Chess) -> u64 {
    pos.zobrist_hash::<Zobrist64>(EnPassantMode::Legal).0
}

impl PositionState {
    /// Start from `fen` with an empty undo stack.
    pub fn new(fen: &str, mode: CastlingMode) -> BridgeResult<Self> {
        Ok(Self {
            position: parse_fen(fen, mode)?,
            stack: Vec::new(),
            codec: MoveCodec::new(mode),
        })
    }

    /// Build the position reached by `moves` from `start_fen`.
    ///
    /// Fails on the first token that is not a legal coordinate move. The
    /// moves applied before it stay applied and are returned in
    /// [`BuildError::partial`].
    pub fn build<S: AsRef<str>>(
        start_fen: &str,
        moves: &[S],
        mode: CastlingMode,
    ) -> Result<Self, BuildError> {
        let mut state = Self::new(start_fen, mode).map_err(|source| BuildError {
            partial: None,
            source,
        })?;
        match state.apply_moves(moves) {
            Ok(()) => Ok(state),
            Err(source) => Err(BuildError {
                partial: Some(Box::new(state)),
                source,
            }),
        }
    }

    /// Like [`PositionState::build`] but skips tokens that do not parse.
    pub fn build_lenient<S: AsRef<str>>(
        start_fen: &str,
        moves: &[S],
        mode: CastlingMode,
    ) -> BridgeResult<Self> {
        let mut state = Self::new(start_fen, mode)?;
        let skipped = state.apply_moves_lenient(moves);
        if skipped > 0 {
            log::debug!("Skipped {skipped} unplayable move(s) while replaying");
        }
        Ok(state)
    }

    /// Apply `moves` in order, stopping at the first illegal token.
    ///
    /// Moves applied before the failing token stay applied.
    pub fn apply_moves<S: AsRef<str>>(&mut self, moves: &[S]) -> BridgeResult<()> {
        for text in moves {
            let m = self.codec.parse(&self.position, text.as_ref())?;
            self.push(m);
        }
        Ok(())
    }

    /// Apply every legal token of `moves`, returning how many were skipped.
    pub fn apply_moves_lenient<S: AsRef<str>>(&mut self, moves: &[S]) -> usize {
        let mut skipped = 0;
        for text in moves {
            match self.codec.parse(&self.position, text.as_ref()) {
                Ok(m) => self.push(m),
                Err(_) => skipped += 1,
            }
        }
        skipped
    }

    /// Apply a move known to be legal, recording how to undo it.
    pub fn push(&mut self, mv: Move) {
        let prior = self.position.clone();
        self.position.play_unchecked(&mv);
        self.stack.push(UndoRecord {
            key: polyglot_key(&prior),
            mv,
            prior,
        });
    }

    /// Undo the most recent move.
    pub fn take_back(&mut self) -> Option<Move> {
        let record = self.stack.pop()?;
        self.position = record.prior;
        Some(record.mv)
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn codec(&self) -> &MoveCodec {
        &self.codec
    }

    /// Number of applied moves
    pub fn ply(&self) -> usize {
        self.stack.len()
    }

    pub fn history(&self) -> impl Iterator<Item = &UndoRecord> {
        self.stack.iter()
    }

    pub fn fen(&self) -> String {
        to_fen(&self.position)
    }

    pub fn key(&self) -> u64 {
        polyglot_key(&self.position)
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        self.position.legal_moves().into_iter().collect()
    }

    /// How often the current position has occurred, counting itself.
    ///
    /// Only the records since the last irreversible move are examined.
    fn repetition_count(&self) -> usize {
        let current = self.key();
        let window = self.position.halfmoves() as usize;
        1 + self
            .stack
            .iter()
            .rev()
            .take(window)
            .filter(|record| record.key == current)
            .count()
    }

    /// True once the current position has been seen three times.
    pub fn is_threefold_repetition(&self) -> bool {
        self.repetition_count() >= 3
    }

    /// Coordinate notation of the applied moves
    pub fn move_texts(&self) -> Vec<String> {
        self.stack
            .iter()
            .map(|record| self.codec.to_coordinate(&record.mv))
            .collect()
    }

    /// Standard notation of the applied moves, each formatted in the
    /// position it was played from.
    pub fn standard_texts(&self) -> Vec<String> {
        self.stack
            .iter()
            .map(|record| self.codec.to_standard(&record.prior, &record.mv))
            .collect()
    }

    pub fn into_position(self) -> Chess {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STD: CastlingMode = CastlingMode::Standard;

    #[test]
    fn test_startpos_sentinel() {
        let state = PositionState::new(STARTPOS, STD).unwrap();
        assert_eq!(state.fen(), START_FEN);
        assert_eq!(state.ply(), 0);
        let explicit = PositionState::new(START_FEN, STD).unwrap();
        assert_eq!(state.key(), explicit.key());
    }

    #[test]
    fn test_build_replays_moves() {
        let state = PositionState::build(STARTPOS, &["e2e4", "e7e5", "g1f3"], STD).unwrap();
        assert_eq!(state.ply(), 3);
        assert_eq!(
            state.fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
        );
        assert_eq!(state.standard_texts(), vec!["e4", "e5", "Nf3"]);
        assert_eq!(state.move_texts(), vec!["e2e4", "e7e5", "g1f3"]);
    }

    #[test]
    fn test_failed_apply_keeps_prefix() {
        let mut state = PositionState::new(STARTPOS, STD).unwrap();
        let err = state.apply_moves(&["e2e4", "e7e5", "e2e9", "g1f3"]).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidMove { ref text } if text == "e2e9"));
        assert_eq!(state.ply(), 2);
        assert_eq!(state.move_texts(), vec!["e2e4", "e7e5"]);
    }

    #[test]
    fn test_failed_build_keeps_prefix() {
        let err = PositionState::build(STARTPOS, &["e2e4", "e7e5", "e2e9", "g1f3"], STD)
            .unwrap_err();
        assert!(matches!(err.source, BridgeError::InvalidMove { ref text } if text == "e2e9"));
        let partial = err.partial.unwrap();
        assert_eq!(partial.ply(), 2);
        assert_eq!(partial.move_texts(), vec!["e2e4", "e7e5"]);
        assert_eq!(
            partial.fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2"
        );

        let err = PositionState::build("not a fen", &["e2e4"], STD).unwrap_err();
        assert!(err.partial.is_none());
        assert!(matches!(BridgeError::from(err), BridgeError::InvalidFen { .. }));
    }

    #[test]
    fn test_lenient_build_skips() {
        let state =
            PositionState::build_lenient(STARTPOS, &["e2e4", "zz", "e7e5", "e1e8"], STD).unwrap();
        assert_eq!(state.move_texts(), vec!["e2e4", "e7e5"]);
    }

    #[test]
    fn test_invalid_fen() {
        let err = PositionState::new("not a fen", STD).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidFen { .. }));
        // Both kings missing
        let err = PositionState::new("8/8/8/8/8/8/8/8 w - - 0 1", STD).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidFen { .. }));
        for blank in ["", "   "] {
            let err = PositionState::new(blank, STD).unwrap_err();
            assert!(matches!(err, BridgeError::InvalidFen { .. }));
        }
    }

    #[test]
    fn test_take_back_restores_position() {
        let mut state = PositionState::build(STARTPOS, &["e2e4", "d7d5"], STD).unwrap();
        let key_after_e4 = {
            let s = PositionState::build(STARTPOS, &["e2e4"], STD).unwrap();
            s.key()
        };
        let undone = state.take_back().unwrap();
        assert_eq!(state.codec().to_coordinate(&undone), "d7d5");
        assert_eq!(state.key(), key_after_e4);
        state.take_back().unwrap();
        assert_eq!(state.fen(), START_FEN);
        assert!(state.take_back().is_none());
    }

    #[test]
    fn test_polyglot_keys() {
        let start = PositionState::new(STARTPOS, STD).unwrap();
        assert_eq!(start.key(), 0x463b96181691fc9c);
        let e4 = PositionState::build(STARTPOS, &["e2e4"], STD).unwrap();
        assert_eq!(e4.key(), 0x823c9b50fd114196);
        assert_eq!(e4.history().next().unwrap().key, 0x463b96181691fc9c);
    }

    #[test]
    fn test_flip_mirrors_position() {
        let state = PositionState::build(STARTPOS, &["e2e4"], STD).unwrap();
        let flipped = flip(state.position(), STD).unwrap();
        assert_eq!(
            to_fen(&flipped),
            "rnbqkbnr/pppp1ppp/8/4p3/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
        assert_eq!(to_fen(&flip(&flipped, STD).unwrap()), state.fen());
    }

    #[test]
    fn test_flip_keeps_en_passant_and_castling() {
        let fen = "r3k2r/8/8/3pP3/8/8/8/R3K3 w Qkq d6 0 3";
        let pos = parse_fen(fen, STD).unwrap();
        let flipped = flip(&pos, STD).unwrap();
        assert_eq!(to_fen(&flipped), "r3k3/8/8/8/3Pp3/8/8/R3K2R b KQq d3 0 3");
        assert_eq!(to_fen(&flip(&flipped, STD).unwrap()), fen);
    }

    #[test]
    fn test_repetition_count() {
        let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];
        let mut state = PositionState::new(STARTPOS, STD).unwrap();
        assert_eq!(state.repetition_count(), 1);
        state.apply_moves(&shuffle).unwrap();
        assert_eq!(state.repetition_count(), 2);
        assert!(!state.is_threefold_repetition());
        state.apply_moves(&shuffle).unwrap();
        assert_eq!(state.repetition_count(), 3);
        assert!(state.is_threefold_repetition());

        // A pawn move resets the window
        state.apply_moves(&["e2e4"]).unwrap();
        assert_eq!(state.repetition_count(), 1);
    }
}
