//! Output formatting module

use anyhow::Result;
use cognate_engine::{GroupingOutcome, Summary};
use serde::Serialize;
use std::io::Write;

/// Trait for output formatters
pub trait OutputFormatter: Send + Sync {
    /// Format the hierarchy listing
    fn format_summary(&mut self, summary: &Summary) -> Result<()>;

    /// Format the grouping preview of one entry
    fn format_preview(&mut self, preview: &EntryPreview) -> Result<()>;

    /// Finalize output (e.g., close JSON array)
    fn finish(&mut self) -> Result<()>;
}

pub mod json;
pub mod markdown;
pub mod text;

pub use json::JsonFormatter;
pub use markdown::MarkdownFormatter;
pub use text::TextFormatter;

/// Grouping preview of one entry, labelled by gloss
#[derive(Debug, Clone, Serialize)]
pub struct EntryPreview {
    /// Gloss of the entry
    pub gloss: String,
    /// What the grouper made of it
    #[serde(flatten)]
    pub outcome: GroupingOutcome,
}

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Indented plain text
    Text,
    /// JSON document
    Json,
    /// Markdown headings and tables
    Markdown,
}

impl OutputFormat {
    /// Parse the format name used in configuration files
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            "markdown" | "md" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Create a formatter writing to `writer`
    pub fn formatter<W>(self, writer: W, pretty_json: bool) -> Box<dyn OutputFormatter>
    where
        W: Write + Send + Sync + 'static,
    {
        match self {
            Self::Text => Box::new(TextFormatter::new(writer)),
            Self::Json => Box::new(JsonFormatter::new(writer, pretty_json)),
            Self::Markdown => Box::new(MarkdownFormatter::new(writer)),
        }
    }
}
