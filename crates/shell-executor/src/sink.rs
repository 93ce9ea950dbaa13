//! Write-and-close endpoints for parsed command output

use std::io;
use std::sync::{Arc, Mutex};

/// A `Sink` receives the parsed output of one command on one stream.
///
/// Each `write` carries one line (newline stripped), except possibly the
/// last, which may be the partial line preceding a sentinel value. `close`
/// is called exactly once, when the shell believes all output for the
/// command has been obtained.
pub trait Sink: Send {
    /// Accepts one chunk of parsed output.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;
    /// Signals that no further output will arrive.
    fn close(&mut self) -> io::Result<()>;
}

/// A [`Sink`] that discards everything. Used for the startup probe, and
/// handy for commands whose output is irrelevant.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevNull;

impl Sink for DevNull {
    fn write(&mut self, _data: &[u8]) -> io::Result<()> {
        Ok(())
    }
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A [`Sink`] that remembers all the non-empty lines it sees.
///
/// Clones share storage, so a commander can hand a clone to the shell and
/// read the accumulated lines back afterwards.
#[derive(Debug, Clone, Default)]
pub struct LineAbsorber {
    data: Arc<Mutex<Vec<String>>>,
}

impl LineAbsorber {
    /// Returns a fresh, empty absorber.
    pub fn new() -> Self {
        Self::default()
    }

    /// The lines absorbed so far.
    pub fn lines(&self) -> Vec<String> {
        self.data.lock().expect("absorber lock poisoned").clone()
    }

    /// Forgets everything absorbed so far.
    pub fn reset(&self) {
        self.data.lock().expect("absorber lock poisoned").clear();
    }
}

impl Sink for LineAbsorber {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if !data.is_empty() {
            let line = String::from_utf8_lossy(data).into_owned();
            self.data.lock().expect("absorber lock poisoned").push(line);
        }
        Ok(())
    }
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}
