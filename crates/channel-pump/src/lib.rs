//! Bounded, line-oriented channels over a long-lived interactive subprocess.
//!
//! This crate owns the lowest layer of shell supervision: it spawns a
//! subprocess and lifts its three byte pipes into four message channels.
//! Commands go in on `stdin`, lines (newline stripped) come out on `stdout`
//! and `stderr`, and at most one terminal error arrives on `done`.
//!
//! The point of this infrastructure is timeouts: both directions carry a
//! liveness bound, so a wedged caller or a wedged consumer always resolves
//! to an error on `done` instead of a deadlock. Closing the `stdin` channel
//! initiates graceful shutdown; closure of `done` is the authoritative
//! signal that the subprocess and its scanners have fully unwound.
//!
//! ```no_run
//! use channel_pump::{start, ChannelParams};
//!
//! # fn main() -> Result<(), channel_pump::Error> {
//! let channels = start(ChannelParams {
//!     path: "/bin/sh".into(),
//!     ..Default::default()
//! })?;
//! smol::block_on(async {
//!     channels.stdin.send("echo hello".into()).await.ok();
//!     channels.stdin.close();
//!     while let Ok(line) = channels.stdout.recv().await {
//!         println!("{line}");
//!     }
//!     assert!(channels.done.recv().await.is_err()); // closed, no error
//! });
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod channels;
pub mod error;
pub mod framer;
pub mod params;
mod start;

pub use channels::{Channels, StreamName};
pub use error::{Error, Result};
pub use framer::frame_command;
pub use params::ChannelParams;
pub use start::start;
