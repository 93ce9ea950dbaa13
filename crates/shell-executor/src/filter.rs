//! Per-stream sentinel filters

use crate::error::Error;
use crate::sink::Sink;
use async_channel::{Receiver, Sender};
use channel_pump::StreamName;
use tracing::{debug, trace};

/// Forwards lines from one output stream to a sink until a line ends with
/// the sentinel value, then closes the sink.
///
/// A line ending with the sentinel value may carry a legitimate early part
/// of itself: that prefix is written to the sink before closing. Returns
/// `true` iff the sentinel was observed and the sink closed cleanly; on
/// every failure path the error goes to the shared infra-error channel
/// and the return is `false`.
pub(crate) async fn scan_for_sentinel(
    stream: Receiver<String>,
    name: StreamName,
    mut sink: Box<dyn Sink>,
    value: String,
    infra_err: Sender<Error>,
) -> bool {
    trace!(%name, sentinel = %value, "filter; awaiting subprocess output");
    while let Ok(line) = stream.recv().await {
        match line.strip_suffix(value.as_str()) {
            // The guard rejects an empty sentinel value, which would
            // otherwise match every line at full length.
            Some(prefix) if prefix.len() < line.len() => {
                trace!(%name, "filter; matched sentinel at end of line");
                if !prefix.is_empty() {
                    if let Err(e) = sink.write(prefix.as_bytes()) {
                        deliver_infra_err(
                            &infra_err,
                            Error::SinkWrite {
                                line: prefix.to_string(),
                                stream: name,
                                source: e,
                            },
                        );
                        return false;
                    }
                }
                if let Err(e) = sink.close() {
                    deliver_infra_err(&infra_err, Error::SinkClose { stream: name, source: e });
                    return false;
                }
                trace!(%name, "filter; sentinel in hand, sink closed");
                return true;
            }
            _ => {
                trace!(%name, line = %line, "filter; no sentinel, forwarding line");
                if let Err(e) = sink.write(line.as_bytes()) {
                    deliver_infra_err(
                        &infra_err,
                        Error::SinkWrite {
                            line,
                            stream: name,
                            source: e,
                        },
                    );
                    return false;
                }
            }
        }
    }
    // Stream ended before the sentinel appeared.
    // It's likely that the subprocess crashed.
    debug!(%name, "filter; stream ended before sentinel");
    let _ = sink.close();
    deliver_infra_err(
        &infra_err,
        Error::ClosedBeforeSentinel {
            stream: name,
            value,
        },
    );
    false
}

/// Non-blocking delivery on the infra-error channel. The channel holds at
/// most one error; with several filters failing at once, the first in wins
/// and the rest are logged.
pub(crate) fn deliver_infra_err(infra_err: &Sender<Error>, err: Error) {
    if let Err(e) = infra_err.try_send(err) {
        debug!(dropped = %e.into_inner(), "infra error already signalled or consumer gone");
    }
}
