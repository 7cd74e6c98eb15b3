//! Line output shared between the command loop and engine observers

use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

type Sink = Box<dyn Write + Send>;

/// Serialised, flushed line writer.
///
/// Engine events arrive on the search thread while command replies are
/// written by the main loop; the lock keeps lines whole.
#[derive(Clone)]
pub struct Output {
    sink: Arc<Mutex<Sink>>,
}

impl Output {
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn new(sink: Sink) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    /// Writer into a shared buffer, for tests
    pub fn capture() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let out = Self::new(Box::new(SharedBuffer(Arc::clone(&buffer))));
        (out, buffer)
    }

    /// Write one line and flush. A closed pipe is logged, not fatal.
    pub fn line(&self, text: impl AsRef<str>) {
        let text = text.as_ref();
        let mut sink = self.sink.lock();
        if let Err(e) = writeln!(sink, "{text}").and_then(|_| sink.flush()) {
            log::warn!("Failed to write '{text}': {e}");
        }
    }

    pub fn info_string(&self, text: impl std::fmt::Display) {
        self.line(format!("info string {text}"));
    }
}

struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
