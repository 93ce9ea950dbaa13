//! The parameter bag for a Shell

use crate::error::Result;
use crate::sentinel::Sentinel;
use channel_pump::{ChannelParams, StreamName};

/// `Parameters` is a bag of parameters for a [`Shell`](crate::Shell)
/// instance.
#[derive(Debug, Clone)]
pub struct Parameters {
    /// Subprocess launch parameters and channel sizings,
    /// handed through to the channel pump.
    pub pump: ChannelParams,

    /// The command sent to the shell after every user command other than
    /// the final one. It is used to be sure that stdout generated in the
    /// course of running command N is swept up and accounted for before
    /// looking for output from command N+1.
    pub sentinel_out: Sentinel,

    /// A command that intentionally triggers output on stderr, e.g. a
    /// misspelled command, something that doesn't cause any real trouble.
    /// If present, it is issued after every user command, before the out
    /// sentinel, so that errors from command N are swept up before errors
    /// from command N+1. If absent, stderr is drained to discard.
    pub sentinel_err: Option<Sentinel>,
}

impl Parameters {
    /// Validates both sentinels. Pump parameters are validated separately
    /// by the pump itself at start.
    pub fn validate(&self) -> Result<()> {
        self.sentinel_out.validate(StreamName::StdOut)?;
        if let Some(se) = &self.sentinel_err {
            se.validate(StreamName::StdErr)?;
        }
        Ok(())
    }
}
