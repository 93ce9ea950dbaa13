//! Subprocess startup and the three supervising actors

use crate::channels::{Channels, StreamName};
use crate::error::{Error, Result};
use crate::framer::frame_command;
use crate::params::ChannelParams;
use async_channel::{Receiver, Sender};
use async_process::{Child, ChildStdin, Command, Stdio};
use futures_lite::io::{AsyncBufReadExt, BufReader};
use futures_lite::{future, AsyncRead, AsyncWriteExt, StreamExt};
use smol::Timer;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Starts a shell subprocess and returns an instance of [`Channels`].
///
/// The holder of this instance can send input on the `stdin` channel,
/// process output from the `stdout` and `stderr` channels, and look for an
/// error on the `done` channel. To stop the subprocess gracefully, close
/// the `stdin` channel.
///
/// Three actors supervise the subprocess: an input driver forwarding
/// framed commands to its stdin pipe, and one scanner per output pipe
/// lifting lines into the bounded channels. Both directions carry a
/// liveness bound (see [`ChannelParams`]), so things terminate and
/// channels close, freeing the caller to focus on the four channels.
pub fn start(mut params: ChannelParams) -> Result<Channels> {
    params.validate()?;

    let mut cmd = Command::new(&params.path);
    cmd.args(&params.args)
        .current_dir(&params.working_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(|e| Error::Spawn {
        path: params.path.clone(),
        source: e,
    })?;
    debug!(path = %params.path, pid = child.id(), "spawned subprocess");

    let stdin_pipe = child.stdin.take().ok_or(Error::Pipe {
        stream: "stdin",
        path: params.path.clone(),
    })?;
    let stdout_pipe = child.stdout.take().ok_or(Error::Pipe {
        stream: "stdout",
        path: params.path.clone(),
    })?;
    let stderr_pipe = child.stderr.take().ok_or(Error::Pipe {
        stream: "stderr",
        path: params.path.clone(),
    })?;

    let (in_tx, in_rx) = async_channel::bounded(params.buff_size_in);
    let (out_tx, out_rx) = async_channel::bounded(params.buff_size_out);
    let (err_tx, err_rx) = async_channel::bounded(params.buff_size_err);
    // done is strictly one-shot: capacity one, non-blocking delivery,
    // losers are logged and dropped.
    let (done_tx, done_rx) = async_channel::bounded(1);

    let scan_out = smol::spawn(scan_stream_into_channel(
        StreamName::StdOut,
        BufReader::new(stdout_pipe),
        out_tx,
        done_tx.clone(),
        params.consumer_backpressure_timeout,
    ));
    let scan_err = smol::spawn(scan_stream_into_channel(
        StreamName::StdErr,
        BufReader::new(stderr_pipe),
        err_tx,
        done_tx.clone(),
        params.consumer_backpressure_timeout,
    ));

    smol::spawn(drive_subprocess(
        in_rx,
        stdin_pipe,
        params.command_terminator,
        params.input_idle_timeout,
        child,
        scan_out,
        scan_err,
        done_tx,
    ))
    .detach();

    Ok(Channels {
        stdin: in_tx,
        stdout: out_rx,
        stderr: err_rx,
        done: done_rx,
    })
}

/// What the input driver saw on its turn of the event loop.
enum InputEvent {
    Command(String),
    Closed,
    TimedOut,
}

/// Forwards commands from the stdin channel to the subprocess, and runs
/// the teardown sequence once that channel closes.
///
/// The driver owns the child and the two scanner tasks; awaiting the
/// tasks is what guarantees that `done` cannot fire before both output
/// channels have closed on the graceful path.
#[allow(clippy::too_many_arguments)]
async fn drive_subprocess(
    commands: Receiver<String>,
    mut stdin_pipe: ChildStdin,
    terminator: Option<u8>,
    idle_timeout: Duration,
    mut child: Child,
    scan_out: smol::Task<Option<String>>,
    scan_err: smol::Task<Option<String>>,
    done: Sender<Error>,
) {
    trace!("stdin; starting loop over the stdin channel");
    loop {
        let next = async {
            match commands.recv().await {
                Ok(line) => InputEvent::Command(line),
                Err(_) => InputEvent::Closed,
            }
        };
        let tick = async {
            Timer::after(idle_timeout).await;
            InputEvent::TimedOut
        };
        match future::or(next, tick).await {
            InputEvent::Command(line) => {
                let bytes = frame_command(&line, terminator);
                trace!(command = %abbrev(&line), "stdin; forwarding command to subprocess");
                let written = async {
                    stdin_pipe.write_all(&bytes).await?;
                    stdin_pipe.flush().await
                };
                if let Err(e) = written.await {
                    warn!(error = %e, "stdin; unable to write to subprocess");
                    deliver_done(&done, Error::StdinWrite(e));
                    scan_out.detach();
                    scan_err.detach();
                    return;
                }
            }
            InputEvent::Closed => break,
            InputEvent::TimedOut => {
                warn!(?idle_timeout, "stdin; no input or close within the bound, abandoning subprocess");
                deliver_done(&done, Error::InputIdle(idle_timeout));
                scan_out.detach();
                scan_err.detach();
                return;
            }
        }
    }

    // The channel closed from the outside, presumably on purpose.
    trace!("stdin; channel closed, shutting down");
    if let Err(e) = stdin_pipe.close().await {
        deliver_done(&done, Error::StdinClose(e));
    }
    drop(stdin_pipe);

    trace!("stdin; awaiting stdOut and stdErr scanner exit");
    let out_failure = scan_out.await;
    let err_failure = scan_err.await;

    let mut failures = Vec::new();
    match child.status().await {
        Ok(status) => {
            if let Some(msg) = exit_failure(status) {
                failures.push(msg);
            }
        }
        Err(e) => failures.push(format!("waiting on subprocess: {e}")),
    }
    failures.extend(out_failure);
    failures.extend(err_failure);

    if !failures.is_empty() {
        deliver_done(&done, Error::Teardown(failures.join(";")));
    }
    trace!("stdin; teardown complete");
}

/// Reads lines from an output pipe and forwards them to a bounded channel,
/// alerting on backpressure from the channel.
///
/// Exits when the pipe closes, when the channel's consumer disappears, or
/// when the backpressure bound expires before a consumer accepts a line.
/// The last case is the sole escape from the deadlock where the scanner
/// cannot enqueue, so the subprocess cannot flush, so it cannot exit.
/// The channel closes on every exit path (its only sender is dropped).
/// Returns a description of the terminal read error, if there was one.
async fn scan_stream_into_channel<R>(
    name: StreamName,
    reader: BufReader<R>,
    ch: Sender<String>,
    done: Sender<Error>,
    consumer_timeout: Duration,
) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    enum Handoff {
        Accepted,
        ConsumerGone,
        TimedOut,
    }

    let mut lines = reader.lines();
    let mut count = 0u64;
    trace!(%name, "awaiting data from subprocess");
    loop {
        match lines.next().await {
            Some(Ok(line)) => {
                count += 1;
                trace!(%name, line = %abbrev(&line), count, "read line");
                let send = async {
                    match ch.send(line).await {
                        Ok(()) => Handoff::Accepted,
                        Err(_) => Handoff::ConsumerGone,
                    }
                };
                let tick = async {
                    Timer::after(consumer_timeout).await;
                    Handoff::TimedOut
                };
                match future::or(send, tick).await {
                    Handoff::Accepted => {}
                    Handoff::ConsumerGone => {
                        // The receiving side was dropped; whoever held it
                        // has abandoned this subprocess.
                        debug!(%name, "consumer gone, ending scan");
                        return None;
                    }
                    Handoff::TimedOut => {
                        warn!(%name, ?consumer_timeout, count, "backpressure bound elapsed");
                        deliver_done(
                            &done,
                            Error::ConsumerBackpressure {
                                stream: name,
                                timeout: consumer_timeout,
                            },
                        );
                        return None;
                    }
                }
            }
            Some(Err(e)) => {
                warn!(%name, error = %e, "read error on pipe");
                return Some(format!("reading {name}: {e}"));
            }
            None => {
                trace!(%name, count, "stream closed");
                return None;
            }
        }
    }
}

/// Non-blocking, one-shot delivery on the done channel.
fn deliver_done(done: &Sender<Error>, err: Error) {
    if let Err(e) = done.try_send(err) {
        debug!(dropped = %e.into_inner(), "done already signalled or consumer gone");
    }
}

fn exit_failure(status: std::process::ExitStatus) -> Option<String> {
    match status.code() {
        Some(0) => None,
        Some(code) => Some(format!("exit status {code}")),
        // Killed by a signal; let the std formatting name it.
        None => Some(status.to_string()),
    }
}

const ABBREV_MAX_LEN: usize = 70;

/// Truncates a line for log output.
fn abbrev(line: &str) -> String {
    if line.chars().count() <= ABBREV_MAX_LEN {
        return line.to_string();
    }
    let head: String = line.chars().take(ABBREV_MAX_LEN - 1).collect();
    head + "..."
}
