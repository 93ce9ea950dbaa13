//! Error types for the channel pump

use crate::channels::StreamName;
use std::time::Duration;
use thiserror::Error;

/// Unified error type for pump construction and supervision.
///
/// Variants created after startup travel to the caller on the `done`
/// channel; the `Display` strings are part of the observability contract
/// and are matched on by test suites.
#[derive(Error, Debug)]
pub enum Error {
    /// The working directory could not be resolved or is not a directory
    #[error("bad working dir {path:?}: {reason}")]
    BadWorkingDir {
        /// The offending path, as given
        path: String,
        /// Why resolution failed
        reason: String,
    },

    /// No executable path was given
    #[error("must specify a path to the executable to run")]
    EmptyPath,

    /// A PATH-style lookup failed to find the executable
    #[error("path {path:?} not available")]
    PathNotFound {
        /// The executable name or path that was looked up
        path: String,
    },

    /// A stdio pipe could not be acquired from the spawned child
    #[error("getting {stream} pipe for {path:?}")]
    Pipe {
        /// Which pipe was missing
        stream: &'static str,
        /// The executable being launched
        path: String,
    },

    /// The subprocess failed to launch
    #[error("trying to start {path:?}: {source}")]
    Spawn {
        /// The executable being launched
        path: String,
        /// The underlying spawn failure
        source: std::io::Error,
    },

    /// A write to the subprocess's stdin pipe failed
    #[error("unable to write to stdin: {0}")]
    StdinWrite(std::io::Error),

    /// Closing the subprocess's stdin pipe failed
    #[error("unable to close stdin: {0}")]
    StdinClose(std::io::Error),

    /// No command or close arrived on the stdin channel within the bound
    #[error("timeout of {0:?} elapsed awaiting for input or close on stdin")]
    InputIdle(Duration),

    /// An output line waited too long for an infrastructure consumer
    #[error("timeout of {timeout:?} elapsed awaiting consumer on {stream}")]
    ConsumerBackpressure {
        /// The stream whose consumer stalled
        stream: StreamName,
        /// The configured backpressure bound
        timeout: Duration,
    },

    /// One or more failures collected at subprocess teardown,
    /// semicolon-joined: exit error first, then scanner errors.
    #[error("{0}")]
    Teardown(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
