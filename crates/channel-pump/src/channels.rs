//! The four message channels bound to one live subprocess

use crate::error::Error;
use async_channel::{Receiver, Sender};

/// `Channels` holds a subprocess's input and output channels.
///
/// The holder sends commands on [`stdin`](Self::stdin), consumes lines from
/// [`stdout`](Self::stdout) and [`stderr`](Self::stderr), and watches
/// [`done`](Self::done) for a terminal error. All four are bounded; the
/// sizings come from [`ChannelParams`](crate::ChannelParams).
#[derive(Debug)]
pub struct Channels {
    /// Accepts command lines. A "command line" is opaque; it might be a
    /// complex, multi-line script, like a shell here-doc. It is forwarded to
    /// the subprocess with no processing other than command termination
    /// (see [`frame_command`](crate::frame_command)).
    ///
    /// Close (or drop) this sender to initiate graceful shutdown.
    pub stdin: Sender<String>,

    /// Lines from the subprocess's stdout, newline stripped.
    pub stdout: Receiver<String>,

    /// Lines from the subprocess's stderr, newline stripped.
    pub stderr: Receiver<String>,

    /// Receive on this after closing `stdin` to learn whether everything
    /// finished cleanly. At most one error is ever delivered; a recv that
    /// fails because the channel closed means success. An error here has
    /// nothing to do with the *content* of `stderr`; that is merely
    /// another output stream.
    pub done: Receiver<Error>,
}

/// Names the two output streams of a subprocess.
///
/// The `Display` values appear in error messages and logs and are matched
/// on by tests, so they are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamName {
    /// The subprocess's standard output
    StdOut,
    /// The subprocess's standard error
    StdErr,
}

impl std::fmt::Display for StreamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StreamName::StdOut => "stdOut",
            StreamName::StdErr => "stdErr",
        })
    }
}
