//! The Shell state machine

use crate::commander::Commander;
use crate::error::{Error, Result};
use crate::infra::{ChannelsMaker, ExecInfra};
use crate::parameters::Parameters;
use crate::sentinel::Sentinel;
use futures::lock::Mutex;
use std::time::Duration;
use tracing::debug;

/// The two states a shell can be in.
///
/// **Off**: no subprocess running. Freshly created; or stop finished; or
/// some call returned an error meaning the subprocess had to be
/// abandoned. Ok to start, but not run or stop.
///
/// **Idle**: subprocess healthy and awaiting input. Start or run finished
/// without error. Ok to run or stop, but not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Off,
    Idle,
}

struct Inner {
    state: State,
    infra: ExecInfra,
}

/// `Shell` manages a shell subprocess, adding value by allowing the
/// output from different commands to be handled differently.
///
/// All calls block until they finish or their deadline expires, and all
/// are serialised by an internal lock, so a `Shell` can be shared across
/// tasks. Any error that implies subprocess loss returns the shell to the
/// off state; a fresh [`start`](Self::start) is then legal.
pub struct Shell {
    inner: Mutex<Inner>,
}

impl Shell {
    /// Returns a new shell in the off state, built from the given
    /// parameters. Nothing is validated or launched until
    /// [`start`](Self::start).
    pub fn new(params: Parameters) -> Self {
        let sentinel_out = params.sentinel_out.clone();
        let sentinel_err = params.sentinel_err.clone();
        let maker: ChannelsMaker = Box::new(move || {
            params.validate()?;
            Ok(channel_pump::start(params.pump.clone())?)
        });
        Self::from_channels_maker(maker, sentinel_out, sentinel_err)
    }

    /// Returns a new shell in the off state, built from the given
    /// channels-maker and sentinels. This is the seam for driving a shell
    /// with bare channels instead of a live subprocess.
    pub fn from_channels_maker(
        maker: ChannelsMaker,
        sentinel_out: Sentinel,
        sentinel_err: Option<Sentinel>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: State::Off,
                infra: ExecInfra::new(maker, sentinel_out, sentinel_err),
            }),
        }
    }

    /// Synchronously starts the shell.
    ///
    /// Assures that the subprocess runs and that the sentinels work
    /// before their first use in [`run`](Self::run).
    ///
    /// Errors:
    /// * the shell was already started;
    /// * something's wrong in the parameters, e.g. the shell program
    ///   cannot be found;
    /// * the sentinels failed to echo in the time allotted.
    pub async fn start(&self, deadline: Duration) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            State::Idle => Err(Error::StartWhileStarted),
            State::Off => match inner.infra.infra_start(deadline).await {
                Ok(()) => {
                    inner.state = State::Idle;
                    Ok(())
                }
                Err(e) => {
                    debug!(error = %e, "start failed; shell remains off");
                    inner.infra.abandon();
                    Err(e)
                }
            },
        }
    }

    /// Sends the commander's command to the shell and waits for it to
    /// complete, routing its output to the commander's sinks.
    ///
    /// An error here means the shell is dead and in need of a fresh call
    /// to [`start`](Self::start).
    ///
    /// Errors:
    /// * the shell hasn't been started;
    /// * no sentinels were detected in the time given;
    /// * the subprocess exited, regardless of exit code.
    pub async fn run(&self, deadline: Duration, commander: &dyn Commander) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            State::Off => Err(Error::RunWhileOff),
            State::Idle => match inner.infra.infra_run(deadline, commander).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    debug!(error = %e, "run failed; shell now off");
                    inner.state = State::Off;
                    inner.infra.abandon();
                    Err(e)
                }
            },
        }
    }

    /// Attempts to gracefully stop the shell.
    ///
    /// Sends the given final command (presumably something like `quit` or
    /// `exit`), or just EOF if it is `None`, and waits for the subprocess
    /// to unwind. Unlike [`run`](Self::run), stop treats the subprocess
    /// exiting with a zero status as success. The shell ends up off with
    /// any outcome.
    ///
    /// Errors:
    /// * the shell wasn't started;
    /// * the subprocess didn't finish in the time allotted;
    /// * the subprocess exited with a non-zero status.
    pub async fn stop(&self, deadline: Duration, final_command: Option<&str>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            State::Off => Err(Error::StopWhileOff),
            State::Idle => {
                inner.state = State::Off;
                let outcome = inner.infra.infra_stop(deadline, final_command).await;
                inner.infra.abandon();
                outcome
            }
        }
    }
}
