//! Helpers for driving the fishbridge binary

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

pub const T_INIT: Duration = Duration::from_secs(5);
pub const T_BESTMOVE: Duration = Duration::from_secs(10);

pub fn spawn_engine(args: &[&str]) -> Child {
    Command::new(env!("CARGO_BIN_EXE_fishbridge"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("Failed to spawn fishbridge")
}

pub fn send_command(stdin: &mut ChildStdin, cmd: &str) {
    println!(">>> {cmd}");
    writeln!(stdin, "{cmd}").expect("Failed to write command");
    stdin.flush().expect("Failed to flush stdin");
}

/// Read lines until one starts with `prefix`
pub fn read_until_prefix(
    reader: &mut BufReader<ChildStdout>,
    prefix: &str,
    timeout: Duration,
) -> Result<String, String> {
    let start = Instant::now();
    let mut buffer = String::new();
    while start.elapsed() < timeout {
        buffer.clear();
        match reader.read_line(&mut buffer) {
            Ok(0) => return Err("EOF reached".to_string()),
            Ok(_) => {
                let line = buffer.trim();
                if line.is_empty() {
                    continue;
                }
                println!("<<< {line}");
                if line.starts_with(prefix) {
                    return Ok(line.to_string());
                }
            }
            Err(e) => return Err(format!("Read error: {e}")),
        }
    }
    Err(format!("Timeout waiting for prefix: {prefix}"))
}

pub fn handshake(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) {
    send_command(stdin, "uci");
    read_until_prefix(reader, "uciok", T_INIT).expect("Failed to receive uciok");
    send_command(stdin, "isready");
    read_until_prefix(reader, "readyok", T_INIT).expect("Failed to receive readyok");
}
