//! Subprocess launch parameters and channel sizings

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default capacity of the stdin command channel.
pub const DEFAULT_BUFF_SIZE_IN: usize = 100;
/// Default capacity of the stdout line channel.
pub const DEFAULT_BUFF_SIZE_OUT: usize = 10_000;
/// Default capacity of the stderr line channel.
pub const DEFAULT_BUFF_SIZE_ERR: usize = 100;

/// Default consumer-backpressure bound. An intentionally odd round number,
/// so that it is easy to spot in logs.
pub const DEFAULT_CONSUMER_BACKPRESSURE_TIMEOUT: Duration = Duration::from_millis(7777);

/// Default input-idle bound. This can be long; a caller that knows command
/// A takes two hours should raise it further.
pub const DEFAULT_INPUT_IDLE_TIMEOUT: Duration = Duration::from_secs(12 * 60 * 60);

/// `ChannelParams` captures all parameters to [`start`](crate::start).
///
/// It is a mix of subprocess parameters, like `path` and `args`, and
/// orchestration parameters, like buffer sizes and timeouts. Zero-valued
/// sizings and timeouts mean "apply the default".
#[derive(Debug, Clone, Default)]
pub struct ChannelParams {
    /// Either the absolute path to the executable, or a `$PATH`-relative
    /// command name. This is the shell being run.
    pub path: String,

    /// Arguments, flags and flag arguments for the invocation.
    pub args: Vec<String>,

    /// Working directory of the subprocess. Empty means the current
    /// directory. Must exist and be a directory.
    pub working_dir: PathBuf,

    /// If set, appended to the end of every command that doesn't already
    /// end with it. A convenience for shells like mysql that want such
    /// things, e.g. `b';'`.
    pub command_terminator: Option<u8>,

    /// How many commands can be queued on `stdin` before sending blocks.
    pub buff_size_in: usize,

    /// How many lines of output can be queued from the subprocess's stdout
    /// before backpressure is applied, forcing the subprocess to wait for
    /// its output to be consumed.
    pub buff_size_out: usize,

    /// Like `buff_size_out`, except for stderr.
    pub buff_size_err: usize,

    /// How long to wait for a command (or close) on the stdin channel
    /// before giving up on the caller. An expired timeout results in an
    /// error on the `done` channel and the subprocess is abandoned.
    /// Raising `buff_size_in` doesn't help here.
    pub input_idle_timeout: Duration,

    /// How long an output line may wait for an infrastructure consumer
    /// before the pump declares the consumer dead. To avoid this, raise
    /// `buff_size_out`/`buff_size_err`, or consume output faster.
    pub consumer_backpressure_timeout: Duration,
}

impl ChannelParams {
    /// Applies defaults and validates the executable and working directory.
    pub fn validate(&mut self) -> Result<()> {
        self.set_defaults();
        self.validate_working_dir()?;
        self.validate_path()
    }

    fn set_defaults(&mut self) {
        if self.buff_size_in < 1 {
            self.buff_size_in = DEFAULT_BUFF_SIZE_IN;
        }
        if self.buff_size_out < 1 {
            self.buff_size_out = DEFAULT_BUFF_SIZE_OUT;
        }
        if self.buff_size_err < 1 {
            self.buff_size_err = DEFAULT_BUFF_SIZE_ERR;
        }
        if self.input_idle_timeout.is_zero() {
            self.input_idle_timeout = DEFAULT_INPUT_IDLE_TIMEOUT;
        }
        if self.consumer_backpressure_timeout.is_zero() {
            self.consumer_backpressure_timeout = DEFAULT_CONSUMER_BACKPRESSURE_TIMEOUT;
        }
    }

    fn validate_working_dir(&mut self) -> Result<()> {
        let given = if self.working_dir.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            self.working_dir.clone()
        };
        let resolved = given.canonicalize().map_err(|e| Error::BadWorkingDir {
            path: given.display().to_string(),
            reason: e.to_string(),
        })?;
        if !resolved.is_dir() {
            return Err(Error::BadWorkingDir {
                path: resolved.display().to_string(),
                reason: "not a directory".into(),
            });
        }
        self.working_dir = resolved;
        Ok(())
    }

    fn validate_path(&self) -> Result<()> {
        if self.path.is_empty() {
            return Err(Error::EmptyPath);
        }
        // A PATH-style lookup, the same one the subprocess launch will do.
        let found = std::process::Command::new("/bin/sh")
            .arg("-c")
            .arg(format!("command -v {}", self.path))
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        if !found {
            return Err(Error::PathNotFound {
                path: self.path.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_applied() {
        let mut p = ChannelParams {
            path: "/bin/sh".into(),
            ..Default::default()
        };
        p.validate().unwrap();
        assert_eq!(p.buff_size_in, DEFAULT_BUFF_SIZE_IN);
        assert_eq!(p.buff_size_out, DEFAULT_BUFF_SIZE_OUT);
        assert_eq!(p.buff_size_err, DEFAULT_BUFF_SIZE_ERR);
        assert_eq!(p.input_idle_timeout, DEFAULT_INPUT_IDLE_TIMEOUT);
        assert_eq!(
            p.consumer_backpressure_timeout,
            DEFAULT_CONSUMER_BACKPRESSURE_TIMEOUT
        );
        assert!(p.working_dir.is_absolute());
    }

    #[test]
    fn explicit_sizings_kept() {
        let mut p = ChannelParams {
            path: "/bin/sh".into(),
            buff_size_out: 1,
            consumer_backpressure_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        p.validate().unwrap();
        assert_eq!(p.buff_size_out, 1);
        assert_eq!(p.consumer_backpressure_timeout, Duration::from_millis(50));
    }

    #[test]
    fn missing_working_dir_rejected() {
        let mut p = ChannelParams {
            path: "/bin/sh".into(),
            working_dir: PathBuf::from("/no/such/directory/anywhere"),
            ..Default::default()
        };
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("bad working dir"));
    }

    #[test]
    fn file_as_working_dir_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut p = ChannelParams {
            path: "/bin/sh".into(),
            working_dir: file.path().to_path_buf(),
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn empty_path_rejected() {
        let mut p = ChannelParams::default();
        let err = p.validate().unwrap_err();
        assert!(err
            .to_string()
            .contains("must specify a path to the executable"));
    }

    #[test]
    fn bogus_path_rejected() {
        let mut p = ChannelParams {
            path: "beamMeUpScotty".into(),
            ..Default::default()
        };
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains(r#"path "beamMeUpScotty" not available"#));
    }
}
