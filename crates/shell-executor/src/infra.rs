//! Infrastructure shared by all shell states

use crate::commander::Commander;
use crate::error::{Error, Result};
use crate::filter::{deliver_infra_err, scan_for_sentinel};
use crate::sentinel::Sentinel;
use crate::sink::{DevNull, Sink};
use async_channel::{Receiver, Sender};
use channel_pump::{Channels, StreamName};
use futures_lite::future;
use smol::Timer;
use std::time::Duration;
use tracing::{debug, trace};

/// Builds a fresh set of pump channels for one start/stop cycle.
///
/// Injectable, so tests can drive a shell with bare channels instead of a
/// live subprocess.
pub type ChannelsMaker = Box<dyn Fn() -> Result<Channels> + Send + Sync>;

/// How a wait on sentinels resolved.
enum Outcome {
    /// Both sentinel filters finished; the flag says whether all of them
    /// actually observed their sentinel.
    Sentinels(bool),
    /// The pump's done channel fired (`Some`) or closed clean (`None`).
    Done(Option<channel_pump::Error>),
    /// A filter posted a fatal error.
    Infra(Error),
    /// The caller's deadline expired.
    DeadlineExpired,
}

/// `ExecInfra` holds shell infrastructure shared by all shell states:
/// the two sentinels, the channels-maker, the live channels, and the
/// channel on which filters signal fatal errors.
pub(crate) struct ExecInfra {
    sentinel_out: Sentinel,
    sentinel_err: Option<Sentinel>,
    channels_maker: ChannelsMaker,
    channels: Option<Channels>,
    infra_err: Option<(Sender<Error>, Receiver<Error>)>,
}

impl ExecInfra {
    pub(crate) fn new(
        channels_maker: ChannelsMaker,
        sentinel_out: Sentinel,
        sentinel_err: Option<Sentinel>,
    ) -> Self {
        Self {
            sentinel_out,
            sentinel_err,
            channels_maker,
            channels: None,
            infra_err: None,
        }
    }

    /// Builds fresh channels and proves the sentinels work before their
    /// first real use: the sentinel commands are issued against dev-null
    /// sinks, and both must echo within the deadline.
    pub(crate) async fn infra_start(&mut self, deadline: Duration) -> Result<()> {
        let channels = (self.channels_maker)()?;
        if self.sentinel_err.is_none() {
            // Without an error sentinel nothing ever reads stderr, so
            // drain it; a full stderr channel would eventually block the
            // subprocess.
            let stderr = channels.stderr.clone();
            debug!("no error sentinel; establishing drain of stdErr");
            smol::spawn(async move { while stderr.recv().await.is_ok() {} }).detach();
        }
        self.channels = Some(channels);
        self.infra_err = Some(async_channel::bounded(1));

        trace!("start; probing sentinels");
        let probe = self
            .fire_sentinel_filters(Box::new(DevNull), Box::new(DevNull))
            .await?;
        match self.await_sentinels(probe, deadline).await {
            Outcome::Sentinels(true) => {
                trace!("start; got sentinels at startup");
                Ok(())
            }
            Outcome::Sentinels(false) => Err(self.take_posted_infra_err()),
            Outcome::Infra(e) => Err(e),
            Outcome::Done(Some(e)) => Err(e.into()),
            Outcome::Done(None) => Err(Error::SubprocessFinished),
            Outcome::DeadlineExpired => Err(Error::StartSentinelTimeout(deadline)),
        }
    }

    /// Issues the commander's command followed by the sentinel probes,
    /// and routes output to the commander's sinks until both sentinels
    /// are swept up.
    pub(crate) async fn infra_run(
        &self,
        deadline: Duration,
        commander: &dyn Commander,
    ) -> Result<()> {
        let channels = self.channels.as_ref().ok_or(Error::RunWhileOff)?;
        let command = commander.command();
        trace!(command = %command, "run; enqueueing command");
        if channels.stdin.send(command.clone()).await.is_err() {
            return Err(self.pending_done_error());
        }
        let filters = self
            .fire_sentinel_filters(commander.stdout_sink(), commander.stderr_sink())
            .await?;
        match self.await_sentinels(filters, deadline).await {
            Outcome::Sentinels(true) => {
                trace!(command = %command, "run; got sentinels");
                Ok(())
            }
            Outcome::Sentinels(false) => Err(self.take_posted_infra_err()),
            Outcome::Infra(e) => Err(e),
            Outcome::Done(Some(e)) => Err(e.into()),
            Outcome::Done(None) => Err(Error::SubprocessFinished),
            Outcome::DeadlineExpired => Err(Error::RunSentinelTimeout {
                command,
                timeout: deadline,
            }),
        }
    }

    /// Sends the optional final command, closes the stdin channel to
    /// trigger graceful pump teardown, and waits for the done signal.
    pub(crate) async fn infra_stop(
        &mut self,
        deadline: Duration,
        final_command: Option<&str>,
    ) -> Result<()> {
        let channels = self.channels.take().ok_or(Error::StopWhileOff)?;
        if let Some(cmd) = final_command.filter(|c| !c.is_empty()) {
            trace!(command = %cmd, "stop; sending final command");
            // A failed send means the pump is already gone;
            // done carries the story either way.
            let _ = channels.stdin.send(cmd.to_string()).await;
        }
        channels.stdin.close();
        // Nothing may rendezvous with the infra-error channel once stop
        // has begun.
        self.infra_err = None;

        enum StopOutcome {
            Done(Option<channel_pump::Error>),
            DeadlineExpired,
        }
        let done = async {
            match channels.done.recv().await {
                Ok(e) => StopOutcome::Done(Some(e)),
                Err(_) => StopOutcome::Done(None),
            }
        };
        let tick = async {
            Timer::after(deadline).await;
            StopOutcome::DeadlineExpired
        };
        match future::or(done, tick).await {
            StopOutcome::Done(None) => {
                trace!("stop; pump finished clean");
                Ok(())
            }
            StopOutcome::Done(Some(e)) => {
                debug!(error = %e, "stop; pump finished with error");
                Err(e.into())
            }
            StopOutcome::DeadlineExpired => Err(Error::StopTimeout(deadline)),
        }
    }

    /// Drops the channels and the infra-error channel. Dropping the
    /// channels closes the pump's stdin stream, which lets an abandoned
    /// subprocess unwind via EOF instead of leaking its actors.
    pub(crate) fn abandon(&mut self) {
        self.channels = None;
        self.infra_err = None;
    }

    /// Sends the sentinel commands and spawns the filters that scan the
    /// two output streams for the sentinel values, passing everything
    /// else to the given sinks.
    ///
    /// The error sentinel is dispatched first: when stop is called with
    /// no final command, whatever ran last determines the subprocess's
    /// exit status in shells that observe `$?`, and the error sentinel is
    /// by construction a failing command.
    async fn fire_sentinel_filters(
        &self,
        out_sink: Box<dyn Sink>,
        mut err_sink: Box<dyn Sink>,
    ) -> Result<(smol::Task<bool>, Option<smol::Task<bool>>)> {
        let channels = self.channels.as_ref().ok_or(Error::RunWhileOff)?;
        let (infra_tx, _) = self.infra_err.as_ref().ok_or(Error::RunWhileOff)?;

        let err_filter = match &self.sentinel_err {
            Some(se) => {
                trace!(command = %se.command, "fire; enqueueing stdErr sentinel command");
                if channels.stdin.send(se.command.clone()).await.is_err() {
                    return Err(self.pending_done_error());
                }
                Some(smol::spawn(scan_for_sentinel(
                    channels.stderr.clone(),
                    StreamName::StdErr,
                    err_sink,
                    se.value.clone(),
                    infra_tx.clone(),
                )))
            }
            None => {
                // No filter runs on stderr, but the sink contract still
                // holds: close it exactly once.
                if let Err(e) = err_sink.close() {
                    deliver_infra_err(
                        infra_tx,
                        Error::SinkClose {
                            stream: StreamName::StdErr,
                            source: e,
                        },
                    );
                }
                None
            }
        };

        trace!(command = %self.sentinel_out.command, "fire; enqueueing stdOut sentinel command");
        if channels.stdin.send(self.sentinel_out.command.clone()).await.is_err() {
            // The out filter must still learn that nothing is coming.
            if let Some(t) = err_filter {
                t.detach();
            }
            return Err(self.pending_done_error());
        }
        let out_filter = smol::spawn(scan_for_sentinel(
            channels.stdout.clone(),
            StreamName::StdOut,
            out_sink,
            self.sentinel_out.value.clone(),
            infra_tx.clone(),
        ));

        Ok((out_filter, err_filter))
    }

    /// Races filter completion against the pump's done channel, the
    /// infra-error channel, and the deadline. Dropping the race on a
    /// non-sentinel outcome cancels the outstanding filters; the shell is
    /// abandoning the subprocess in that case anyway.
    async fn await_sentinels(
        &self,
        (out_filter, err_filter): (smol::Task<bool>, Option<smol::Task<bool>>),
        deadline: Duration,
    ) -> Outcome {
        let channels = match self.channels.as_ref() {
            Some(c) => c,
            None => return Outcome::Done(None),
        };
        let infra_rx = match self.infra_err.as_ref() {
            Some((_, rx)) => rx.clone(),
            None => return Outcome::Done(None),
        };

        let sentinels = async {
            let err_ok = match err_filter {
                Some(t) => t.await,
                None => true,
            };
            let out_ok = out_filter.await;
            Outcome::Sentinels(err_ok && out_ok)
        };
        let done = async {
            match channels.done.recv().await {
                Ok(e) => Outcome::Done(Some(e)),
                Err(_) => Outcome::Done(None),
            }
        };
        let infra = async {
            match infra_rx.recv().await {
                Ok(e) => Outcome::Infra(e),
                // Sender gone; nothing will ever arrive here.
                Err(_) => future::pending().await,
            }
        };
        let tick = async {
            Timer::after(deadline).await;
            Outcome::DeadlineExpired
        };
        future::or(future::or(sentinels, infra), future::or(done, tick)).await
    }

    /// Fetches the error a failed filter posted. The filters post before
    /// completing, so when completion reports failure the error is
    /// already buffered; the fallback covers a consumer that raced it
    /// away.
    fn take_posted_infra_err(&self) -> Error {
        if let Some((_, rx)) = self.infra_err.as_ref() {
            if let Ok(e) = rx.try_recv() {
                return e;
            }
        }
        Error::SubprocessFinished
    }

    /// The error explaining a refused stdin send: either the pump already
    /// published its failure on done, or it shut down clean underneath us.
    fn pending_done_error(&self) -> Error {
        if let Some(channels) = self.channels.as_ref() {
            if let Ok(e) = channels.done.try_recv() {
                return e.into();
            }
        }
        Error::SubprocessFinished
    }
}
