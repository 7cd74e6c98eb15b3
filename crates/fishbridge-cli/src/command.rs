//! Front-end command parser

use anyhow::{anyhow, Result};
use fishbridge_core::{GoParams, STARTPOS};

/// One input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Uci,
    IsReady,
    SetOption {
        name: String,
        value: Option<String>,
    },
    Position {
        fen: String,
        moves: Vec<String>,
    },
    Go(GoParams),
    Stop,
    PonderHit,
    Quit,
    /// Legal moves of the current position
    Legal,
    /// FEN of the current position
    Fen,
    /// Polyglot key of the current position
    Key,
    /// Replace the current position by its colour-swapped mirror image
    Flip,
    /// Coordinate moves to standard notation; without moves, the moves of
    /// the current position from its start
    San(Vec<String>),
    /// Standard notation moves, played from the current position, to
    /// coordinate notation
    Can(Vec<String>),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Uci => "uci",
            Command::IsReady => "isready",
            Command::SetOption { .. } => "setoption",
            Command::Position { .. } => "position",
            Command::Go(_) => "go",
            Command::Stop => "stop",
            Command::PonderHit => "ponderhit",
            Command::Quit => "quit",
            Command::Legal => "legal",
            Command::Fen => "fen",
            Command::Key => "key",
            Command::Flip => "flip",
            Command::San(_) => "san",
            Command::Can(_) => "can",
        }
    }
}

/// Parse one input line
pub fn parse_command(line: &str) -> Result<Command> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.is_empty() {
        return Err(anyhow!("Empty command"));
    }
    let rest = &parts[1..];
    let words = || rest.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    match parts[0] {
        "uci" => Ok(Command::Uci),
        "isready" => Ok(Command::IsReady),
        "stop" => Ok(Command::Stop),
        "ponderhit" => Ok(Command::PonderHit),
        "quit" => Ok(Command::Quit),
        "legal" => Ok(Command::Legal),
        "fen" => Ok(Command::Fen),
        "key" => Ok(Command::Key),
        "flip" => Ok(Command::Flip),
        "san" => Ok(Command::San(words())),
        "can" => Ok(Command::Can(words())),

        "setoption" => parse_setoption(rest),
        "position" => parse_position(rest),
        "go" => Ok(Command::Go(GoParams::parse(rest)?)),

        other => Err(anyhow!("Unknown command: {other}")),
    }
}

/// `name <name words> [value <value words>]`
fn parse_setoption(parts: &[&str]) -> Result<Command> {
    if parts.len() < 2 || parts[0] != "name" {
        return Err(anyhow!("Invalid setoption format"));
    }
    let value_pos = parts.iter().position(|&p| p == "value");
    let name_end = value_pos.unwrap_or(parts.len());
    if name_end <= 1 {
        return Err(anyhow!("setoption requires an option name"));
    }
    let name = parts[1..name_end].join(" ");
    let value = value_pos
        .map(|pos| parts[pos + 1..].join(" "))
        .filter(|v| !v.is_empty());

    Ok(Command::SetOption { name, value })
}

/// `(startpos | fen <fields>) [moves <m1> ...]`
fn parse_position(parts: &[&str]) -> Result<Command> {
    let moves_pos = parts.iter().position(|&p| p == "moves");
    let head_end = moves_pos.unwrap_or(parts.len());

    let fen = match parts.first() {
        Some(&"startpos") if head_end == 1 => STARTPOS.to_string(),
        Some(&"fen") if head_end > 1 => parts[1..head_end].join(" "),
        Some(&"fen") => return Err(anyhow!("position fen requires a FEN")),
        _ => return Err(anyhow!("Position must start with 'startpos' or 'fen'")),
    };
    let moves = match moves_pos {
        Some(pos) => parts[pos + 1..].iter().map(|s| s.to_string()).collect(),
        None => Vec::new(),
    };

    Ok(Command::Position { fen, moves })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_command("uci").unwrap(), Command::Uci);
        assert_eq!(parse_command("  isready  ").unwrap(), Command::IsReady);
        assert_eq!(parse_command("ponderhit").unwrap(), Command::PonderHit);
        assert!(parse_command("").is_err());
        assert!(parse_command("usinewgame").is_err());
    }

    #[test]
    fn test_setoption() {
        assert_eq!(
            parse_command("setoption name Clear Hash").unwrap(),
            Command::SetOption {
                name: "Clear Hash".into(),
                value: None
            }
        );
        assert_eq!(
            parse_command("setoption name Book File value my book.bin").unwrap(),
            Command::SetOption {
                name: "Book File".into(),
                value: Some("my book.bin".into())
            }
        );
        assert!(parse_command("setoption Hash 16").is_err());
        assert!(parse_command("setoption name value 3").is_err());
    }

    #[test]
    fn test_position() {
        assert_eq!(
            parse_command("position startpos moves e2e4 e7e5").unwrap(),
            Command::Position {
                fen: STARTPOS.into(),
                moves: vec!["e2e4".into(), "e7e5".into()]
            }
        );
        assert_eq!(
            parse_command("position fen 8/8/8/8/8/8/8/K6k w - - 0 1").unwrap(),
            Command::Position {
                fen: "8/8/8/8/8/8/8/K6k w - - 0 1".into(),
                moves: vec![]
            }
        );
        assert!(parse_command("position").is_err());
        assert!(parse_command("position fen moves e2e4").is_err());
        assert!(parse_command("position sfen lnsgkgsnl/9 b - 1").is_err());
    }

    #[test]
    fn test_go_delegates_to_params() {
        match parse_command("go wtime 1000 btime 900 movestogo 20").unwrap() {
            Command::Go(params) => {
                assert_eq!(params.wtime, Some(1000));
                assert_eq!(params.btime, Some(900));
                assert_eq!(params.movestogo, Some(20));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse_command("go depth x").is_err());
        assert!(parse_command("go sideways").is_err());
    }

    #[test]
    fn test_translation_commands() {
        assert_eq!(parse_command("san").unwrap(), Command::San(vec![]));
        assert_eq!(
            parse_command("can e4 e5").unwrap(),
            Command::Can(vec!["e4".into(), "e5".into()])
        );
        assert_eq!(parse_command("key").unwrap().name(), "key");
        assert_eq!(parse_command("flip").unwrap(), Command::Flip);
    }
}
