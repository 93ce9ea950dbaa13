//! Sentinel pairs used to delimit command output

use crate::error::{Error, Result};
use channel_pump::StreamName;

/// A sentinel fails validation if its value is shorter than this.
/// The longer the value, the less the chance of confusing it with
/// legitimate output.
pub const SENTINEL_VALUE_LEN_MIN: usize = 6;

/// A `Sentinel` holds a `{command, value}` pair.
///
/// A sentinel is used to recognize the end of command output on a stream.
/// Examples:
///
/// ```text
/// command: echo pink elephants dance
/// value:   pink elephants dance
///
/// command: version
/// value:   v1.2.3
///
/// command: rumpelstiltskin
/// value:   rumpelstiltskin: command not found
/// ```
#[derive(Debug, Clone)]
pub struct Sentinel {
    /// A command that should do very little, do it quickly, and have
    /// deterministic, newline-terminated output.
    pub command: String,

    /// The expected value from `command`. Comparisons are made per
    /// streamed line, working backwards from the newline: the value
    /// `"foo"` matches the line `"foo"` but not the line `"foo bar"`.
    pub value: String,
}

impl Sentinel {
    /// Returns an error if there's a problem in the sentinel.
    ///
    /// This validation is critical; with an empty sentinel value the
    /// output filter would never stop consuming its stream.
    pub fn validate(&self, stream: StreamName) -> Result<()> {
        if self.command.is_empty() {
            return Err(Error::MissingSentinelCommand { stream });
        }
        if self.value.len() < SENTINEL_VALUE_LEN_MIN {
            return Err(Error::SentinelValueTooShort {
                stream,
                value: self.value.clone(),
                len: self.value.len(),
                min: SENTINEL_VALUE_LEN_MIN,
            });
        }
        Ok(())
    }
}
