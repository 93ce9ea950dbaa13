//! Error types for the shell executor

use channel_pump::StreamName;
use std::time::Duration;
use thiserror::Error;

/// Unified error type for shell construction and command execution.
///
/// Configuration and state errors are returned synchronously and leave the
/// shell's state unchanged; every other variant means the subprocess has
/// been abandoned and the shell has returned to the off state. The
/// `Display` strings are part of the observability contract.
#[derive(Error, Debug)]
pub enum Error {
    /// A sentinel was configured without a command
    #[error("must specify a command for the {stream} sentinel")]
    MissingSentinelCommand {
        /// The stream the sentinel was meant to delimit
        stream: StreamName,
    },

    /// A sentinel value is too short to be safely recognisable
    #[error("{stream} sentinel value {value:?} too short at len={len}; must be at least {min} chars long")]
    SentinelValueTooShort {
        /// The stream the sentinel was meant to delimit
        stream: StreamName,
        /// The offending value
        value: String,
        /// Its length
        len: usize,
        /// The required minimum
        min: usize,
    },

    /// An error from the underlying channel pump
    #[error(transparent)]
    Pump(#[from] channel_pump::Error),

    /// The startup probe produced no sentinels within the deadline
    #[error("starting, but no sentinels found after {0:?}")]
    StartSentinelTimeout(Duration),

    /// A command's sentinels did not appear within the deadline
    #[error("running {command:?}, no sentinels found after {timeout:?}")]
    RunSentinelTimeout {
        /// The command that was running
        command: String,
        /// The expired deadline
        timeout: Duration,
    },

    /// The subprocess did not finish within the stop deadline
    #[error("stop failure; shell not done after {0:?}")]
    StopTimeout(Duration),

    /// An output stream ended before its sentinel was observed.
    /// It is likely that the subprocess crashed.
    #[error("{stream} closed before sentinel {value:?} found")]
    ClosedBeforeSentinel {
        /// The stream that ended early
        stream: StreamName,
        /// The sentinel value that never appeared
        value: String,
    },

    /// The subprocess's channels shut down while sentinels were awaited
    #[error("subprocess finished before sentinels were found")]
    SubprocessFinished,

    /// Writing parsed output to a commander's sink failed
    #[error("problem writing line {line:?} to {stream} sink: {source}")]
    SinkWrite {
        /// The line that could not be written
        line: String,
        /// The stream being parsed
        stream: StreamName,
        /// The underlying write failure
        source: std::io::Error,
    },

    /// Closing a commander's sink failed
    #[error("problem closing {stream} sink: {source}")]
    SinkClose {
        /// The stream being parsed
        stream: StreamName,
        /// The underlying close failure
        source: std::io::Error,
    },

    /// `start` called on a shell that is already started
    #[error("start called, but shell is already started")]
    StartWhileStarted,

    /// `run` called on a shell that is not started
    #[error("run called, but shell not started yet")]
    RunWhileOff,

    /// `stop` called on a shell that is not started
    #[error("stop called, but shell not started yet")]
    StopWhileOff,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
