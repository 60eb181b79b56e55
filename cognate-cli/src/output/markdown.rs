//! Markdown output formatter

use super::{EntryPreview, OutputFormatter};
use anyhow::Result;
use cognate_engine::Summary;
use std::io::Write;

/// Markdown formatter - outputs headings per protosegment and a table of sets
pub struct MarkdownFormatter<W: Write> {
    writer: W,
    entry_count: usize,
}

impl<W: Write> MarkdownFormatter<W> {
    /// Create a new markdown formatter
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            entry_count: 0,
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|")
}

impl<W: Write + Send + Sync> OutputFormatter for MarkdownFormatter<W> {
    fn format_summary(&mut self, summary: &Summary) -> Result<()> {
        for zone in &summary.zones {
            writeln!(self.writer, "## {}", zone.name)?;
            writeln!(self.writer)?;
            for protosegment in &zone.protosegments {
                writeln!(self.writer, "### {}", protosegment.label)?;
                writeln!(self.writer)?;
                if protosegment.clusters.is_empty() {
                    writeln!(self.writer, "*No clusters*")?;
                    writeln!(self.writer)?;
                    continue;
                }
                writeln!(self.writer, "| Environment | Set | Pattern | Citations | Remarks |")?;
                writeln!(self.writer, "|---|---|---|---|---|")?;
                for cluster in &protosegment.clusters {
                    for set in &cluster.sets {
                        writeln!(
                            self.writer,
                            "| {}.{} `{}` | {} | `{}` | {} | {} |",
                            cluster.order,
                            set.order,
                            cell(&cluster.environment),
                            set.id,
                            cell(&set.pattern),
                            set.citations,
                            cell(&set.remarks)
                        )?;
                    }
                }
                writeln!(self.writer)?;
            }
        }
        writeln!(self.writer, "---")?;
        writeln!(
            self.writer,
            "*Total: {} clusters, {} sets, {} citations*",
            summary.totals.clusters, summary.totals.sets, summary.totals.citations
        )?;
        Ok(())
    }

    fn format_preview(&mut self, preview: &EntryPreview) -> Result<()> {
        self.entry_count += 1;
        writeln!(self.writer, "{}. **{}**", self.entry_count, preview.gloss)?;
        for candidate in &preview.outcome.patterns {
            writeln!(
                self.writer,
                "   - column {}: `{}`",
                candidate.position, candidate.pattern
            )?;
        }
        for skipped in &preview.outcome.skipped {
            writeln!(self.writer, "   - *skipped: {skipped}*")?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.entry_count > 0 {
            writeln!(self.writer)?;
            writeln!(self.writer, "---")?;
            writeln!(self.writer, "*Total entries: {}*", self.entry_count)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
