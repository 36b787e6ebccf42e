//! Command-line interface
//!
//! Commands:
//! - `check` - verify connectivity and basic read access
//! - `discover` - sample collections and emit a typed catalog
//! - `streams` - list collection names without sampling
//! - `read` - sync records from selected streams

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat, SyncModeArg};
pub use runner::Runner;
