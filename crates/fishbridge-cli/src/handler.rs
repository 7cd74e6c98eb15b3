//! Command dispatch onto a [`Bridge`]

use crate::command::Command;
use crate::output::Output;
use anyhow::Result;
use fishbridge_core::{Bridge, BridgeError, EngineEvent, GoParams, GoRequest, STARTPOS};

/// Whether the command loop keeps running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Front-end state: the bridge plus the last `position` command.
pub struct Session {
    bridge: Bridge,
    out: Output,
    fen: String,
    moves: Vec<String>,
}

impl Session {
    /// Wrap `bridge`, printing every engine event to `out`.
    pub fn new(bridge: Bridge, out: Output) -> Self {
        let sink = out.clone();
        bridge.add_observer(move |event: &EngineEvent| sink.line(event.to_string()));
        Self {
            bridge,
            out,
            fen: STARTPOS.to_string(),
            moves: Vec::new(),
        }
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Run one command. Input errors are reported as `info string error`
    /// lines; only unrecoverable errors are returned.
    pub fn handle(&mut self, cmd: Command) -> Result<Flow> {
        log::debug!("Handling {}", cmd.name());
        match self.dispatch(cmd) {
            Ok(flow) => Ok(flow),
            Err(e) if e.is_recoverable() => {
                self.out.info_string(format!("error {e}"));
                Ok(Flow::Continue)
            }
            Err(e) => {
                self.out.info_string(format!("error {e}"));
                log::error!("Unrecoverable bridge error: {e}");
                Err(e.into())
            }
        }
    }

    fn dispatch(&mut self, cmd: Command) -> Result<Flow, BridgeError> {
        match cmd {
            Command::Uci => self.send_identity(),
            Command::IsReady => self.out.line("readyok"),
            Command::SetOption { name, value } => {
                self.bridge
                    .set_option(&name, value.as_deref().unwrap_or_default())?;
            }
            Command::Position { fen, moves } => {
                self.fen = fen;
                self.moves = moves;
            }
            Command::Go(params) => self.go(params)?,
            Command::Stop => self.bridge.stop()?,
            Command::PonderHit => self.bridge.ponderhit()?,
            Command::Quit => {
                self.bridge.stop()?;
                return Ok(Flow::Quit);
            }
            Command::Legal => {
                let fen = self.bridge.get_fen(&self.fen, &self.moves)?;
                let moves = self.bridge.legal_moves(&fen)?;
                self.out.line(format!("legal {}", moves.join(" ")).trim_end());
            }
            Command::Fen => {
                let fen = self.bridge.get_fen(&self.fen, &self.moves)?;
                self.out.line(format!("fen {fen}"));
            }
            Command::Key => {
                let key = self.bridge.key(&self.fen, &self.moves)?;
                self.out.line(format!("key {key:016x}"));
            }
            Command::Flip => {
                let fen = self.bridge.flip(&self.fen, &self.moves)?;
                self.out.line(format!("fen {fen}"));
                self.fen = fen;
                self.moves.clear();
            }
            Command::San(moves) => {
                let san = if moves.is_empty() {
                    self.bridge.to_san(&self.fen, &self.moves)?
                } else {
                    let fen = self.bridge.get_fen(&self.fen, &self.moves)?;
                    self.bridge.to_san(&fen, &moves)?
                };
                self.out.line(format!("san {}", san.join(" ")).trim_end());
            }
            Command::Can(moves) => {
                let fen = self.bridge.get_fen(&self.fen, &self.moves)?;
                let can = self.bridge.to_can(&fen, &moves)?;
                self.out.line(format!("can {}", can.join(" ")).trim_end());
            }
        }
        Ok(Flow::Continue)
    }

    fn go(&self, params: GoParams) -> Result<(), BridgeError> {
        let request = GoRequest {
            fen: self.fen.clone(),
            moves: self.moves.clone(),
            params,
        };
        self.bridge.go(&request)
    }

    fn send_identity(&self) {
        let info = self.bridge.info();
        let (name, author) = info
            .split_once(" by ")
            .unwrap_or((info.as_str(), "unknown"));
        self.out.line(format!("id name {name}"));
        self.out.line(format!("id author {author}"));
        for option in self.bridge.get_options() {
            self.out.line(option.to_string());
        }
        self.out.line("uciok");
    }
}
