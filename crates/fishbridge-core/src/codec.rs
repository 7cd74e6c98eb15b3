//! Move notation conversion.
//!
//! Coordinate notation (`e2e4`, `e7e8q`) and standard algebraic notation
//! (`Nf3`, `exd5`, `O-O`, `a8=Q+`) are both resolved against the legal moves
//! of a concrete position, so a text only ever maps to a move that can be
//! played there.

use crate::error::{BridgeError, BridgeResult};
use shakmaty::{CastlingMode, Chess, File, Move, Position, Role, Square};

/// Annotation glyphs that may trail a move in standard notation
const ANNOTATION_CHARS: &[char] = &['!', '?'];

/// Converts between move texts and [`Move`] values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveCodec {
    castling: CastlingMode,
}

impl Default for MoveCodec {
    fn default() -> Self {
        Self::new(CastlingMode::Standard)
    }
}

impl MoveCodec {
    pub fn new(castling: CastlingMode) -> Self {
        Self { castling }
    }

    pub fn castling_mode(&self) -> CastlingMode {
        self.castling
    }

    /// Parse a coordinate-notation move legal in `pos`.
    ///
    /// In standard mode castling is written as the king's two-square step and
    /// the king-takes-rook form is accepted as well. In Chess960 mode only the
    /// king-takes-rook form exists.
    pub fn parse(&self, pos: &Chess, text: &str) -> BridgeResult<Move> {
        let token = text.trim();
        if !looks_like_coordinate(token) {
            log::debug!("Rejecting malformed move token '{token}'");
            return Err(BridgeError::invalid_move(token));
        }
        let token = token.to_ascii_lowercase();

        pos.legal_moves()
            .into_iter()
            .find(|m| {
                self.to_coordinate(m) == token
                    || (self.castling == CastlingMode::Standard
                        && m.is_castle()
                        && king_takes_rook(m) == token)
            })
            .ok_or_else(|| BridgeError::invalid_move(text.trim()))
    }

    /// Coordinate notation of `m`.
    pub fn to_coordinate(&self, m: &Move) -> String {
        match *m {
            Move::Normal {
                from,
                to,
                promotion,
                ..
            } => match promotion {
                Some(role) => format!("{from}{to}{}", role.char()),
                None => format!("{from}{to}"),
            },
            Move::EnPassant { from, to } => format!("{from}{to}"),
            Move::Castle { king, rook } => match self.castling {
                CastlingMode::Chess960 => format!("{king}{rook}"),
                CastlingMode::Standard => {
                    let file = if rook > king { File::G } else { File::C };
                    format!("{king}{}", Square::from_coords(file, king.rank()))
                }
            },
            Move::Put { role, to } => format!("{}@{to}", role.upper_char()),
        }
    }

    /// Standard algebraic notation of `m`, which must be legal in `pos`.
    ///
    /// Disambiguation is computed from the full legal move set and the check
    /// or mate suffix from the position after the move.
    pub fn to_standard(&self, pos: &Chess, m: &Move) -> String {
        let mut san = match *m {
            Move::Castle { king, rook } => {
                if rook > king {
                    "O-O".to_string()
                } else {
                    "O-O-O".to_string()
                }
            }
            Move::Put { role, to } => format!("{}@{to}", role.upper_char()),
            Move::EnPassant { from, to } => format!("{}x{to}", from.file().char()),
            Move::Normal {
                role: Role::Pawn,
                from,
                capture,
                to,
                promotion,
            } => {
                let mut s = String::with_capacity(6);
                if capture.is_some() {
                    s.push(from.file().char());
                    s.push('x');
                }
                s.push_str(&to.to_string());
                if let Some(promo) = promotion {
                    s.push('=');
                    s.push(promo.upper_char());
                }
                s
            }
            Move::Normal {
                role,
                from,
                capture,
                to,
                ..
            } => {
                let mut s = String::with_capacity(7);
                s.push(role.upper_char());
                s.push_str(&disambiguation(pos, role, from, to));
                if capture.is_some() {
                    s.push('x');
                }
                s.push_str(&to.to_string());
                s
            }
        };

        let mut after = pos.clone();
        after.play_unchecked(m);
        if after.is_checkmate() {
            san.push('#');
        } else if after.is_check() {
            san.push('+');
        }
        san
    }

    /// Resolve a standard-notation move in `pos`.
    ///
    /// Trailing annotations (`!`, `?!`) are ignored and a missing or
    /// superfluous check suffix is tolerated. `0-0` is read as `O-O`.
    pub fn from_standard(&self, pos: &Chess, text: &str) -> BridgeResult<Move> {
        let wanted = normalize_standard(text);
        if wanted.is_empty() {
            return Err(BridgeError::invalid_move(text.trim()));
        }
        let bare = strip_check_suffix(&wanted);

        let legal = pos.legal_moves();
        let mut loose_match = None;
        for m in legal.iter() {
            let san = self.to_standard(pos, m);
            if san == wanted {
                return Ok(m.clone());
            }
            if loose_match.is_none() && strip_check_suffix(&san) == bare {
                loose_match = Some(m.clone());
            }
        }
        loose_match.ok_or_else(|| BridgeError::invalid_move(text.trim()))
    }
}

fn looks_like_coordinate(token: &str) -> bool {
    let bytes = token.as_bytes();
    if !(bytes.len() == 4 || bytes.len() == 5) {
        return false;
    }
    let square = |f: u8, r: u8| {
        (b'a'..=b'h').contains(&f.to_ascii_lowercase()) && (b'1'..=b'8').contains(&r)
    };
    square(bytes[0], bytes[1])
        && square(bytes[2], bytes[3])
        && (bytes.len() == 4 || b"qrbnk".contains(&bytes[4].to_ascii_lowercase()))
}

fn king_takes_rook(m: &Move) -> String {
    match *m {
        Move::Castle { king, rook } => format!("{king}{rook}"),
        _ => String::new(),
    }
}

fn disambiguation(pos: &Chess, role: Role, from: Square, to: Square) -> String {
    let rivals: Vec<Square> = pos
        .legal_moves()
        .iter()
        .filter(|m| !m.is_castle() && m.role() == role && m.to() == to)
        .filter_map(|m| m.from())
        .filter(|&sq| sq != from)
        .collect();

    if rivals.is_empty() {
        return String::new();
    }
    if rivals.iter().all(|sq| sq.file() != from.file()) {
        return from.file().char().to_string();
    }
    if rivals.iter().all(|sq| sq.rank() != from.rank()) {
        return from.rank().char().to_string();
    }
    from.to_string()
}

fn normalize_standard(text: &str) -> String {
    let trimmed = text.trim().trim_end_matches(ANNOTATION_CHARS);
    match trimmed {
        "0-0" | "0-0+" | "0-0#" => trimmed.replace('0', "O"),
        "0-0-0" | "0-0-0+" | "0-0-0#" => trimmed.replace('0', "O"),
        _ => trimmed.to_string(),
    }
}

fn strip_check_suffix(san: &str) -> &str {
    san.trim_end_matches(&['+', '#'][..])
}
