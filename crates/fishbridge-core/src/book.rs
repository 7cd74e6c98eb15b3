//! Polyglot opening book
//!
//! A book is a flat array of 16-byte big-endian entries sorted by position
//! key:
//!
//! ```text
//! u64 key | u16 move | u16 weight | u32 learn
//! ```
//!
//! The move packs the target square in bits 0-5, the source square in bits
//! 6-11 and the promotion piece (1 = knight .. 4 = queen) in bits 12-14.
//! Castling is stored as the king capturing its own rook (`e1h1`).

use crate::codec::MoveCodec;
use crate::error::{BridgeError, BridgeResult};
use crate::position::polyglot_key;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use shakmaty::{Chess, Move};
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

/// Size of one on-disk entry in bytes
pub const ENTRY_SIZE: usize = 16;

const FILES: &[u8; 8] = b"abcdefgh";
const RANKS: &[u8; 8] = b"12345678";
const PROMOTIONS: &[u8; 4] = b"nbrq";

/// One book entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookEntry {
    pub key: u64,
    pub raw_move: u16,
    pub weight: u16,
    pub learn: u32,
}

impl BookEntry {
    /// Coordinate text of the stored move, castling still in
    /// king-takes-rook form.
    pub fn move_text(&self) -> String {
        let square = |bits: u16| {
            let file = FILES[(bits & 0x7) as usize] as char;
            let rank = RANKS[((bits >> 3) & 0x7) as usize] as char;
            format!("{file}{rank}")
        };
        let mut text = square((self.raw_move >> 6) & 0x3f) + &square(self.raw_move & 0x3f);
        let promote = (self.raw_move >> 12) & 0x7;
        if (1..=4).contains(&promote) {
            text.push(PROMOTIONS[(promote - 1) as usize] as char);
        }
        text
    }

    /// Encode a coordinate move text, the inverse of [`BookEntry::move_text`].
    pub fn encode_move(text: &str) -> Option<u16> {
        let bytes = text.as_bytes();
        if !(bytes.len() == 4 || bytes.len() == 5) {
            return None;
        }
        let square = |f: u8, r: u8| -> Option<u16> {
            let file = FILES.iter().position(|&c| c == f)? as u16;
            let rank = RANKS.iter().position(|&c| c == r)? as u16;
            Some((rank << 3) | file)
        };
        let from = square(bytes[0], bytes[1])?;
        let to = square(bytes[2], bytes[3])?;
        let promote = match bytes.get(4) {
            Some(p) => PROMOTIONS.iter().position(|c| c == p)? as u16 + 1,
            None => 0,
        };
        Some((promote << 12) | (from << 6) | to)
    }

    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            key: reader.read_u64::<BigEndian>()?,
            raw_move: reader.read_u16::<BigEndian>()?,
            weight: reader.read_u16::<BigEndian>()?,
            learn: reader.read_u32::<BigEndian>()?,
        })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u64::<BigEndian>(self.key)?;
        writer.write_u16::<BigEndian>(self.raw_move)?;
        writer.write_u16::<BigEndian>(self.weight)?;
        writer.write_u32::<BigEndian>(self.learn)
    }
}

/// In-memory Polyglot book
#[derive(Debug, Clone, Default)]
pub struct PolyglotBook {
    path: Option<PathBuf>,
    entries: Vec<BookEntry>,
}

impl PolyglotBook {
    /// Load a book file completely.
    pub fn open(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let wrap = |source| BridgeError::Book {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(wrap)?;
        let len = file.metadata().map_err(wrap)?.len();
        let mut book = Self::from_reader(BufReader::new(file), len).map_err(wrap)?;
        book.path = Some(path.to_path_buf());
        log::info!("Loaded {} book entries from {}", book.len(), path.display());
        Ok(book)
    }

    /// Read `byte_len` bytes of entries from `reader`.
    pub fn from_reader<R: Read>(mut reader: R, byte_len: u64) -> io::Result<Self> {
        if byte_len % ENTRY_SIZE as u64 != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("book size {byte_len} is not a multiple of {ENTRY_SIZE}"),
            ));
        }
        let count = (byte_len / ENTRY_SIZE as u64) as usize;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(BookEntry::read_from(&mut reader)?);
        }
        Ok(Self::from_entries(entries))
    }

    /// Build a book from entries in any order.
    pub fn from_entries(mut entries: Vec<BookEntry>) -> Self {
        entries.sort_by_key(|e| e.key);
        Self {
            path: None,
            entries,
        }
    }

    /// Write the book in Polyglot format.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for entry in &self.entries {
            entry.write_to(&mut writer)?;
        }
        writer.flush()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries stored for `key`, in file order.
    pub fn entries_for(&self, key: u64) -> &[BookEntry] {
        let start = self.entries.partition_point(|e| e.key < key);
        let end = start + self.entries[start..].partition_point(|e| e.key == key);
        &self.entries[start..end]
    }

    /// Book moves playable in `pos`, heaviest first. Entries whose move is
    /// not legal in the position are dropped.
    pub fn moves_for(&self, pos: &Chess, codec: &MoveCodec) -> Vec<(Move, BookEntry)> {
        let mut found: Vec<(Move, BookEntry)> = self
            .entries_for(polyglot_key(pos))
            .iter()
            .filter_map(|entry| {
                let text = entry.move_text();
                match codec.parse(pos, &text) {
                    Ok(m) => Some((m, *entry)),
                    Err(_) => {
                        log::debug!("Ignoring illegal book move {text}");
                        None
                    }
                }
            })
            .collect();
        found.sort_by(|a, b| b.1.weight.cmp(&a.1.weight));
        found
    }

    /// Heaviest book move, limited to `allowed` when it is not empty.
    pub fn best_move(&self, pos: &Chess, codec: &MoveCodec, allowed: &[Move]) -> Option<Move> {
        self.moves_for(pos, codec)
            .into_iter()
            .find(|(m, entry)| entry.weight > 0 && (allowed.is_empty() || allowed.contains(m)))
            .map(|(m, _)| m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{PositionState, STARTPOS};
    use shakmaty::CastlingMode;
    use std::io::Cursor;

    const START_KEY: u64 = 0x463b96181691fc9c;

    fn entry(key: u64, text: &str, weight: u16) -> BookEntry {
        BookEntry {
            key,
            raw_move: BookEntry::encode_move(text).unwrap(),
            weight,
            learn: 0,
        }
    }

    #[test]
    fn test_move_encoding() {
        // e2e4: from 12, to 28
        let raw = BookEntry::encode_move("e2e4").unwrap();
        assert_eq!(raw, 12 << 6 | 28);
        assert_eq!(entry(0, "e2e4", 1).move_text(), "e2e4");
        assert_eq!(entry(0, "a7a8q", 1).move_text(), "a7a8q");
        assert_eq!(entry(0, "b2b1n", 1).move_text(), "b2b1n");
        assert!(BookEntry::encode_move("e2e9").is_none());
    }

    #[test]
    fn test_round_trip_through_bytes() {
        let book = PolyglotBook::from_entries(vec![
            entry(START_KEY, "e2e4", 10),
            entry(1, "a2a3", 1),
        ]);
        let mut bytes = Vec::new();
        book.write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len(), 2 * ENTRY_SIZE);
        // Entries are sorted by key on disk
        assert_eq!(&bytes[..8], &1u64.to_be_bytes());

        let reread = PolyglotBook::from_reader(Cursor::new(&bytes), bytes.len() as u64).unwrap();
        assert_eq!(reread.len(), 2);
        assert_eq!(reread.entries_for(START_KEY), book.entries_for(START_KEY));
    }

    #[test]
    fn test_truncated_book_rejected() {
        let err = PolyglotBook::from_reader(Cursor::new(vec![0u8; 20]), 20).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_lookup_orders_by_weight() {
        let book = PolyglotBook::from_entries(vec![
            entry(START_KEY, "d2d4", 5),
            entry(START_KEY, "e2e4", 20),
            entry(START_KEY, "e2e5", 50),
            entry(START_KEY + 1, "g1f3", 99),
        ]);
        assert_eq!(book.entries_for(START_KEY).len(), 3);
        assert!(book.entries_for(42).is_empty());

        let codec = MoveCodec::default();
        let pos = Chess::default();
        let texts: Vec<String> = book
            .moves_for(&pos, &codec)
            .iter()
            .map(|(m, _)| codec.to_coordinate(m))
            .collect();
        assert_eq!(texts, vec!["e2e4", "d2d4"]);

        let best = book.best_move(&pos, &codec, &[]).unwrap();
        assert_eq!(codec.to_coordinate(&best), "e2e4");

        let d4 = codec.parse(&pos, "d2d4").unwrap();
        assert_eq!(book.best_move(&pos, &codec, &[d4.clone()]), Some(d4));
    }

    #[test]
    fn test_castling_entry_maps_to_castle() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        let state = PositionState::new(fen, CastlingMode::Standard).unwrap();
        let book = PolyglotBook::from_entries(vec![entry(state.key(), "e1h1", 1)]);
        let codec = MoveCodec::default();
        let best = book.best_move(state.position(), &codec, &[]).unwrap();
        assert!(best.is_castle());
        assert_eq!(codec.to_coordinate(&best), "e1g1");
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.bin");
        let book = PolyglotBook::from_entries(vec![entry(START_KEY, "e2e4", 1)]);
        book.write_to(File::create(&path).unwrap()).unwrap();

        let loaded = PolyglotBook::open(&path).unwrap();
        assert_eq!(loaded.path(), Some(path.as_path()));
        let state = PositionState::new(STARTPOS, CastlingMode::Standard).unwrap();
        assert_eq!(loaded.entries_for(state.key()).len(), 1);

        let err = PolyglotBook::open(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, BridgeError::Book { .. }));
    }
}
