//! Logger setup for the front end.
//!
//! stdout carries protocol lines only, so every record goes to stderr as
//! `[LEVEL] target: message`. With `FORCE_FLUSH_STDERR=1` each record is
//! flushed as it is written, for hosts that read stderr through a pipe.

use std::io::{self, Write};

/// Env var that turns on per-record flushing
pub const FORCE_FLUSH_ENV: &str = "FORCE_FLUSH_STDERR";

/// Writer that flushes the wrapped sink after every write.
pub struct FlushingWriter<W: Write> {
    inner: W,
}

impl<W: Write> FlushingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl FlushingWriter<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> Write for FlushingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.inner.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Install the global logger. `RUST_LOG` overrides the default level.
pub fn init(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let force_flush = std::env::var(FORCE_FLUSH_ENV).as_deref() == Ok("1");

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, level),
    );
    builder
        .format(|buf, record| {
            writeln!(buf, "[{}] {}: {}", record.level(), record.target(), record.args())
        })
        .write_style(env_logger::WriteStyle::Never);
    if force_flush {
        builder.target(env_logger::Target::Pipe(Box::new(FlushingWriter::stderr())));
    } else {
        builder.target(env_logger::Target::Stderr);
    }
    builder.init();
}
