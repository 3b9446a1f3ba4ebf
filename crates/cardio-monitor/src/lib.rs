//! cardio-monitor library.
//!
//! Argument parsing and the run loop behind the `cardio-monitor` binary,
//! exposed so they can be tested without a process boundary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod cli;

pub use app::{init_tracing, load_config, run, stream, RunSummary};
pub use cli::Cli;
