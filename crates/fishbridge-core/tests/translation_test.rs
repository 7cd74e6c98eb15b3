//! Notation, FEN and key translation through the bridge

use fishbridge_core::options::{CONTEMPT, HASH, PONDER};
use fishbridge_core::{Bridge, BridgeConfig, BridgeError, START_FEN, STARTPOS};

const NO_MOVES: &[&str] = &[];

fn bridge() -> Bridge {
    Bridge::new(BridgeConfig::default()).expect("default bridge")
}

#[test]
fn test_to_can_converts_standard_notation() {
    let bridge = bridge();
    assert_eq!(
        bridge.to_can(STARTPOS, &["e4", "e5", "Nf3"]).unwrap(),
        vec!["e2e4", "e7e5", "g1f3"]
    );
    // Check suffixes and annotations are tolerated
    assert_eq!(
        bridge.to_can(STARTPOS, &["f3", "e5", "g4", "Qh4#!"]).unwrap(),
        vec!["f2f3", "e7e5", "g2g4", "d8h4"]
    );
}

#[test]
fn test_to_san_converts_coordinates() {
    let bridge = bridge();
    assert_eq!(
        bridge
            .to_san(STARTPOS, &["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"])
            .unwrap(),
        vec!["e4", "e5", "Nf3", "Nc6", "Bb5"]
    );
    assert_eq!(
        bridge.to_san(STARTPOS, &["f2f3", "e7e5", "g2g4", "d8h4"]).unwrap(),
        vec!["f3", "e5", "g4", "Qh4#"]
    );
}

#[test]
fn test_strict_operations_reject_illegal_moves() {
    let bridge = bridge();
    let err = bridge.to_san(STARTPOS, &["e2e4", "e2e4"]).unwrap_err();
    assert!(matches!(err, BridgeError::InvalidMove { ref text } if text == "e2e4"));
    assert!(matches!(
        bridge.to_can(STARTPOS, &["e4", "Ke2", "Ke3"]),
        Err(BridgeError::InvalidMove { .. })
    ));
    assert!(matches!(
        bridge.key(STARTPOS, &["e2e5"]),
        Err(BridgeError::InvalidMove { .. })
    ));
}

#[test]
fn test_get_fen_skips_illegal_moves() {
    let bridge = bridge();
    assert_eq!(bridge.get_fen(STARTPOS, NO_MOVES).unwrap(), START_FEN);
    let strict = bridge.get_fen(STARTPOS, &["e2e4", "e7e5"]).unwrap();
    let lenient = bridge.get_fen(STARTPOS, &["e2e4", "e2e4", "xx", "e7e5"]).unwrap();
    assert_eq!(strict, lenient);
    assert_eq!(
        strict,
        "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2"
    );
}

#[test]
fn test_get_fen_rejects_bad_start() {
    let bridge = bridge();
    assert!(matches!(
        bridge.get_fen("rnbqkbnr/pppppppp w", NO_MOVES),
        Err(BridgeError::InvalidFen { .. })
    ));
}

#[test]
fn test_get_fen_rejects_empty_start() {
    let bridge = bridge();
    assert!(matches!(
        bridge.get_fen("", NO_MOVES),
        Err(BridgeError::InvalidFen { .. })
    ));
    assert!(matches!(
        bridge.go(&fishbridge_core::GoRequest::new("  ", &[])),
        Err(BridgeError::InvalidFen { .. })
    ));
}

#[test]
fn test_flip_swaps_sides() {
    let bridge = bridge();
    let flipped = bridge.flip(STARTPOS, &["e2e4", "e7e5"]).unwrap();
    assert_eq!(
        flipped,
        "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 2"
    );

    let fen = "r1bqk2r/pppp1ppp/2n2n2/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQ1RK1 b kq - 5 4";
    let once = bridge.flip(fen, NO_MOVES).unwrap();
    assert_eq!(
        once,
        "rnbq1rk1/pppp1ppp/5n2/2b1p3/2B1P3/2N2N2/PPPP1PPP/R1BQK2R w KQ - 5 4"
    );
    assert_eq!(bridge.flip(&once, NO_MOVES).unwrap(), fen);
}

#[test]
fn test_legal_moves_of_start_position() {
    let bridge = bridge();
    let moves = bridge.legal_moves(STARTPOS).unwrap();
    assert_eq!(moves.len(), 20);
    assert!(moves.contains(&"g1f3".to_string()));
    assert!(moves.contains(&"a2a4".to_string()));

    // Checkmated side has no moves
    let mated = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";
    assert!(bridge.legal_moves(mated).unwrap().is_empty());
}

#[test]
fn test_promotion_and_en_passant_texts() {
    let bridge = bridge();
    let fen = "8/P7/8/3pP3/8/8/8/k6K w - d6 0 1";
    let moves = bridge.legal_moves(fen).unwrap();
    for m in ["a7a8q", "a7a8r", "a7a8b", "a7a8n", "e5d6"] {
        assert!(moves.contains(&m.to_string()), "missing {m}");
    }
    assert_eq!(bridge.to_san(fen, &["e5d6"]).unwrap(), vec!["exd6"]);
    assert_eq!(bridge.to_san(fen, &["a7a8q"]).unwrap(), vec!["a8=Q+"]);
}

#[test]
fn test_keys_match_polyglot() {
    let bridge = bridge();
    assert_eq!(bridge.key(STARTPOS, NO_MOVES).unwrap(), 0x463b96181691fc9c);
    assert_eq!(bridge.key(STARTPOS, &["e2e4"]).unwrap(), 0x823c9b50fd114196);
    assert_eq!(
        bridge.key(STARTPOS, &["e2e4", "d7d5"]).unwrap(),
        0x0756b94461c50fb0
    );
}

#[test]
fn test_set_option_validation() {
    let bridge = bridge();
    assert!(matches!(
        bridge.set_option(HASH, -1),
        Err(BridgeError::InvalidOptionValue { .. })
    ));
    assert!(matches!(
        bridge.set_option("No Such Option", 1),
        Err(BridgeError::UnknownOption { .. })
    ));
    assert!(matches!(
        bridge.set_option(PONDER, "maybe"),
        Err(BridgeError::InvalidOptionValue { .. })
    ));

    bridge.set_option("hash", 128).unwrap();
    bridge.set_option(CONTEMPT, -20).unwrap();
    let options = bridge.get_options();
    let value = |name: &str| {
        options
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.value.to_string())
            .unwrap()
    };
    assert_eq!(value(HASH), "128");
    assert_eq!(value(CONTEMPT), "-20");
}

#[test]
fn test_options_listed_in_registration_order() {
    let lines: Vec<String> = bridge().get_options().iter().map(|o| o.to_string()).collect();
    assert_eq!(
        lines[0],
        "option name Hash type spin default 16 min 1 max 33554432"
    );
    assert_eq!(lines[1], "option name Clear Hash type button");
    assert!(lines.contains(&"option name UCI_Chess960 type check default false".to_string()));
}
