//! Error handling for the CLI application

use std::fmt;

/// Custom error type for CLI-specific errors
#[derive(Debug)]
pub enum CliError {
    /// File not found or inaccessible
    FileNotFound(String),
    /// A name on the command line matches nothing in the project
    UnknownReference(String),
    /// Malformed command-line argument
    InvalidArgument(String),
    /// Configuration error
    ConfigError(String),
    /// A move needs the caller to pick one of several clusters
    ChoiceRequired(String),
    /// Some entries of a batch could not be tabulated
    TabulationFailed(usize),
    /// The project failed its structural checks
    InvalidProject(usize),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::FileNotFound(path) => write!(f, "File not found: {path}"),
            CliError::UnknownReference(name) => write!(f, "Unknown reference: {name}"),
            CliError::InvalidArgument(arg) => write!(f, "Invalid argument: {arg}"),
            CliError::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
            CliError::ChoiceRequired(candidates) => {
                write!(f, "Several clusters qualify, pass --choose with one of: {candidates}")
            }
            CliError::TabulationFailed(count) => {
                write!(f, "{count} entries could not be tabulated")
            }
            CliError::InvalidProject(count) => write!(f, "Project has {count} problem(s)"),
        }
    }
}

impl std::error::Error for CliError {}

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, anyhow::Error>;
