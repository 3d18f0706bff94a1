//! ctigraph CLI library.
//!
//! Command-line glue around the extraction pipeline: argument parsing,
//! settings and ontology loading, artifact I/O, and output formatting.

pub mod artifacts;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use config::{Config, OutputFormat};
pub use error::{CliError, Result};
pub use output::Formatter;
