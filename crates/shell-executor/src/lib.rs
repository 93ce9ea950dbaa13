//! Sentinel-framed command execution over a long-lived interactive shell.
//!
//! An interactive shell is a raw byte stream with no native notion of
//! "end of command output". This crate turns one into a request/response
//! interface: after each user command it appends a *sentinel* probe (a
//! cheap command with deterministic output) and parses the probe's echo
//! out of the output streams to find the boundary. Everything before the
//! echo belongs to the user's command and is routed to caller-supplied
//! sinks.
//!
//! The transport below (subprocess supervision, bounded channels,
//! liveness timeouts) lives in the [`channel_pump`] crate.
//!
//! ```no_run
//! use shell_executor::{Parameters, RecallCommander, Sentinel, Shell};
//! use std::time::Duration;
//!
//! smol::block_on(async {
//!     let sh = Shell::new(Parameters {
//!         pump: channel_pump::ChannelParams {
//!             path: "/bin/sh".into(),
//!             ..Default::default()
//!         },
//!         sentinel_out: Sentinel {
//!             command: "echo supercalifragilisticexpialidocious".into(),
//!             value: "supercalifragilisticexpialidocious".into(),
//!         },
//!         sentinel_err: None,
//!     });
//!     let deadline = Duration::from_secs(2);
//!     sh.start(deadline).await?;
//!     let cmdr = RecallCommander::new("echo alpha");
//!     sh.run(deadline, &cmdr).await?;
//!     assert_eq!(cmdr.data_out(), vec!["alpha"]);
//!     sh.stop(deadline, None).await
//! })
//! .unwrap();
//! ```

#![warn(missing_docs)]

pub mod commander;
pub mod error;
mod filter;
mod infra;
pub mod parameters;
pub mod sentinel;
pub mod sink;
mod shell;

pub use commander::{Commander, DiscardCommander, LabellingCommander, RecallCommander};
pub use error::{Error, Result};
pub use infra::ChannelsMaker;
pub use parameters::Parameters;
pub use sentinel::{Sentinel, SENTINEL_VALUE_LEN_MIN};
pub use shell::Shell;
pub use sink::{DevNull, LineAbsorber, Sink};
