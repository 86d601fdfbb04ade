//! # pulse-server
//!
//! Wiring for the `clusterpulse` binary: command line and environment
//! configuration, logging setup, signal handling, and the task layout that
//! runs the collection loop next to the HTTP server.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod cli;
pub mod duration;
pub mod error;
pub mod logging;

pub use cli::{Cli, LogFormat, Mode};
pub use duration::parse_duration;
pub use error::{ServerError, ServerResult};
