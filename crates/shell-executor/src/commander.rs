//! The commander contract and its reference implementations

use crate::sink::{DevNull, LineAbsorber, Sink};

/// A `Commander` knows a CLI command, and knows how to absorb the
/// command's output.
///
/// The shell calls [`stdout_sink`](Self::stdout_sink) and
/// [`stderr_sink`](Self::stderr_sink) once per run, writes everything that
/// comes out of the subprocess as a result of issuing
/// [`command`](Self::command), and closes each sink when it believes all
/// output for that stream has been obtained.
pub trait Commander: Send + Sync {
    /// The actual command to issue to the shell.
    fn command(&self) -> String;
    /// A sink for whatever the command produces on stdout.
    fn stdout_sink(&self) -> Box<dyn Sink>;
    /// A sink for whatever the command produces on stderr.
    fn stderr_sink(&self) -> Box<dyn Sink>;
}

/// A [`Commander`] that discards all output.
#[derive(Debug, Clone)]
pub struct DiscardCommander {
    /// The command to issue.
    pub command: String,
}

impl Commander for DiscardCommander {
    fn command(&self) -> String {
        self.command.clone()
    }
    fn stdout_sink(&self) -> Box<dyn Sink> {
        Box::new(DevNull)
    }
    fn stderr_sink(&self) -> Box<dyn Sink> {
        Box::new(DevNull)
    }
}

/// A [`Commander`] that prints output to the current process's stdout,
/// prefixing each line to distinguish the two streams.
#[derive(Debug, Clone)]
pub struct LabellingCommander {
    /// The command to issue.
    pub command: String,
}

impl LabellingCommander {
    /// Returns a commander that labels output of the given command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Commander for LabellingCommander {
    fn command(&self) -> String {
        self.command.clone()
    }
    fn stdout_sink(&self) -> Box<dyn Sink> {
        Box::new(LabellingPrinter { prefix: "out" })
    }
    fn stderr_sink(&self) -> Box<dyn Sink> {
        Box::new(LabellingPrinter { prefix: "err" })
    }
}

struct LabellingPrinter {
    prefix: &'static str,
}

impl Sink for LabellingPrinter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        println!("{}: {}", self.prefix, String::from_utf8_lossy(data));
        Ok(())
    }
    fn close(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A [`Commander`] that remembers all the non-empty lines it sees,
/// for inspection after the run.
#[derive(Debug, Clone)]
pub struct RecallCommander {
    /// The command to issue. Mutate between runs to reuse the absorbers.
    pub command: String,
    out: LineAbsorber,
    err: LineAbsorber,
}

impl RecallCommander {
    /// Returns a commander that accumulates output of the given command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            out: LineAbsorber::new(),
            err: LineAbsorber::new(),
        }
    }

    /// Lines seen on stdout so far.
    pub fn data_out(&self) -> Vec<String> {
        self.out.lines()
    }

    /// Lines seen on stderr so far.
    pub fn data_err(&self) -> Vec<String> {
        self.err.lines()
    }

    /// Forgets all absorbed lines.
    pub fn reset(&self) {
        self.out.reset();
        self.err.reset();
    }
}

impl Commander for RecallCommander {
    fn command(&self) -> String {
        self.command.clone()
    }
    fn stdout_sink(&self) -> Box<dyn Sink> {
        Box::new(self.out.clone())
    }
    fn stderr_sink(&self) -> Box<dyn Sink> {
        Box::new(self.err.clone())
    }
}
