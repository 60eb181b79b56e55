//! Cognate CLI library
//!
//! This library provides the command-line interface for tabulating
//! alignments into correspondence sets and refining the resulting hierarchy.

pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod progress;
pub mod project;
pub mod wordlist;

pub use error::{CliError, CliResult};
