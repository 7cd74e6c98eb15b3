//! Events published by a running search.

use std::fmt;

/// Asynchronous engine output.
///
/// `Display` renders the native protocol line, so a sink that only wants
/// text can print it as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Free-form output line (`info depth 3 score cp 20 pv e2e4 ...`)
    Info(String),

    /// The search ended. Published exactly once per search.
    SearchConcluded {
        best_move: Option<String>,
        ponder_move: Option<String>,
    },
}

impl EngineEvent {
    pub fn info(line: impl Into<String>) -> Self {
        EngineEvent::Info(line.into())
    }

    /// Shorthand for `info string <text>`
    pub fn info_string(text: impl fmt::Display) -> Self {
        EngineEvent::Info(format!("info string {text}"))
    }

    pub fn concluded(best_move: Option<String>, ponder_move: Option<String>) -> Self {
        EngineEvent::SearchConcluded {
            best_move,
            ponder_move,
        }
    }

    pub fn is_conclusion(&self) -> bool {
        matches!(self, EngineEvent::SearchConcluded { .. })
    }
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineEvent::Info(line) => f.write_str(line),
            EngineEvent::SearchConcluded {
                best_move,
                ponder_move,
            } => {
                match best_move {
                    Some(m) => write!(f, "bestmove {m}")?,
                    None => f.write_str("bestmove (none)")?,
                }
                if let (Some(_), Some(p)) = (best_move, ponder_move) {
                    write!(f, " ponder {p}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conclusion_lines() {
        let event = EngineEvent::concluded(Some("e2e4".into()), Some("e7e5".into()));
        assert_eq!(event.to_string(), "bestmove e2e4 ponder e7e5");
        assert!(event.is_conclusion());

        let event = EngineEvent::concluded(Some("e2e4".into()), None);
        assert_eq!(event.to_string(), "bestmove e2e4");

        let event = EngineEvent::concluded(None, Some("e7e5".into()));
        assert_eq!(event.to_string(), "bestmove (none)");
    }

    #[test]
    fn test_info_lines() {
        let event = EngineEvent::info_string("book move");
        assert_eq!(event.to_string(), "info string book move");
        assert!(!event.is_conclusion());
    }
}
