//! JSON output formatter

use super::{EntryPreview, OutputFormatter};
use anyhow::Result;
use cognate_engine::Summary;
use serde_json::Value;
use std::io::Write;

/// JSON formatter - outputs the summary as one object, previews as an array
pub struct JsonFormatter<W: Write> {
    writer: W,
    pretty: bool,
    summary: Option<Value>,
    previews: Vec<Value>,
}

impl<W: Write> JsonFormatter<W> {
    /// Create a new JSON formatter
    pub fn new(writer: W, pretty: bool) -> Self {
        Self {
            writer,
            pretty,
            summary: None,
            previews: Vec::new(),
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send + Sync> OutputFormatter for JsonFormatter<W> {
    fn format_summary(&mut self, summary: &Summary) -> Result<()> {
        self.summary = Some(serde_json::to_value(summary)?);
        Ok(())
    }

    fn format_preview(&mut self, preview: &EntryPreview) -> Result<()> {
        self.previews.push(serde_json::to_value(preview)?);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let document = match self.summary.take() {
            Some(summary) => summary,
            None => Value::Array(std::mem::take(&mut self.previews)),
        };
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, &document)?;
        } else {
            serde_json::to_writer(&mut self.writer, &document)?;
        }
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}
