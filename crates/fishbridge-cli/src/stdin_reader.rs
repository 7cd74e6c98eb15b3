use crossbeam_channel::{Sender, TrySendError};
use fishbridge_cli::command::{parse_command, Command};
use fishbridge_cli::output::Output;
use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};

/// Read commands from stdin on a background thread.
///
/// Malformed lines are reported and skipped. End of input is turned into a
/// `quit` so the main loop shuts down cleanly.
pub fn spawn_stdin_reader(cmd_tx: Sender<Command>, out: Output) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        match e.kind() {
                            io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe => {
                                log::info!("Stdin closed, shutting down")
                            }
                            _ => log::error!("Stdin read error: {e}"),
                        }
                        break;
                    }
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                log::debug!("Received: {line}");

                let cmd = match parse_command(line) {
                    Ok(cmd) => cmd,
                    Err(e) => {
                        log::warn!("Failed to parse command '{line}': {e}");
                        out.info_string(format!("error {e}"));
                        continue;
                    }
                };
                let is_quit = cmd == Command::Quit;
                match cmd_tx.try_send(cmd) {
                    Ok(()) => {}
                    Err(TrySendError::Full(cmd)) => {
                        log::warn!("Command channel full, dropping {}", cmd.name());
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        log::debug!("Command channel disconnected, exiting stdin reader");
                        return;
                    }
                }
                if is_quit {
                    return;
                }
            }

            if cmd_tx.send(Command::Quit).is_err() {
                log::debug!("Channel closed before quit after EOF");
            }
            log::debug!("Stdin reader thread exiting (EOF)");
        })
}
