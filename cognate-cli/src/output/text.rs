//! Plain text output formatter

use super::{EntryPreview, OutputFormatter};
use anyhow::Result;
use cognate_engine::Summary;
use std::io::{self, Write};

/// Plain text formatter - outputs an indented listing
pub struct TextFormatter<W: Write> {
    writer: W,
}

impl<W: Write> TextFormatter<W> {
    /// Create a new text formatter
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl TextFormatter<io::Stdout> {
    /// Create a formatter that writes to stdout
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send + Sync> OutputFormatter for TextFormatter<W> {
    fn format_summary(&mut self, summary: &Summary) -> Result<()> {
        for zone in &summary.zones {
            writeln!(self.writer, "Zone {}", zone.name)?;
            for protosegment in &zone.protosegments {
                write!(
                    self.writer,
                    "  {} (protosegment {})",
                    protosegment.label, protosegment.id
                )?;
                if !protosegment.remarks.is_empty() {
                    write!(self.writer, " {}", protosegment.remarks)?;
                }
                writeln!(self.writer)?;
                for cluster in &protosegment.clusters {
                    writeln!(
                        self.writer,
                        "    {}. {} (cluster {})",
                        cluster.order, cluster.environment, cluster.id
                    )?;
                    for set in &cluster.sets {
                        write!(
                            self.writer,
                            "       {}. {}  [set {}, {} citations]",
                            set.order, set.pattern, set.id, set.citations
                        )?;
                        if !set.remarks.is_empty() {
                            write!(self.writer, " {}", set.remarks)?;
                        }
                        writeln!(self.writer)?;
                    }
                }
            }
        }
        let totals = &summary.totals;
        writeln!(
            self.writer,
            "Totals: {} zones, {} protosegments, {} clusters, {} sets, {} citations",
            totals.zones, totals.protosegments, totals.clusters, totals.sets, totals.citations
        )?;
        Ok(())
    }

    fn format_preview(&mut self, preview: &EntryPreview) -> Result<()> {
        let outcome = &preview.outcome;
        match outcome.group {
            Some(group) => writeln!(self.writer, "{} (group {})", preview.gloss, group)?,
            None => writeln!(self.writer, "{}: no patterns", preview.gloss)?,
        }
        for candidate in &outcome.patterns {
            writeln!(self.writer, "  {}: {}", candidate.position, candidate.pattern)?;
        }
        for skipped in &outcome.skipped {
            writeln!(self.writer, "  skipped: {skipped}")?;
        }
        for pending in &outcome.pending {
            writeln!(
                self.writer,
                "  pending: group {} variety {} used datum {} of {} candidates",
                pending.group,
                pending.variety,
                pending.used,
                pending.candidates.len()
            )?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cognate_core::{CandidatePattern, GroupingOutcome, Pattern};
    use cognate_engine::summary::{ClusterSummary, ProtosegmentSummary, SetSummary, Totals, ZoneSummary};
    use cognate_engine::{ClusterId, EntryId, GroupId, ProtosegmentId, SetId, ZoneId};

    fn summary() -> Summary {
        Summary {
            zones: vec![ZoneSummary {
                id: ZoneId(1),
                name: "stops".to_string(),
                protosegments: vec![ProtosegmentSummary {
                    id: ProtosegmentId(1),
                    label: "*p".to_string(),
                    remarks: String::new(),
                    clusters: vec![ClusterSummary {
                        id: ClusterId(2),
                        order: 1,
                        environment: "#_".to_string(),
                        sets: vec![SetSummary {
                            id: SetId(3),
                            order: 1,
                            pattern: "p,p,p".to_string(),
                            citations: 2,
                            remarks: "Grimm".to_string(),
                        }],
                    }],
                }],
            }],
            totals: Totals {
                zones: 1,
                protosegments: 1,
                clusters: 1,
                sets: 1,
                citations: 2,
            },
        }
    }

    #[test]
    fn test_summary_listing() {
        let mut formatter = TextFormatter::new(Vec::new());
        formatter.format_summary(&summary()).unwrap();
        formatter.finish().unwrap();
        let output = String::from_utf8(formatter.into_inner()).unwrap();
        assert!(output.contains("Zone stops"));
        assert!(output.contains("  *p (protosegment 1)"));
        assert!(output.contains("1. #_ (cluster 2)"));
        assert!(output.contains("1. p,p,p  [set 3, 2 citations] Grimm"));
        assert!(output.ends_with("1 sets, 2 citations\n"));
    }

    #[test]
    fn test_preview_listing() {
        let preview = EntryPreview {
            gloss: "father".to_string(),
            outcome: GroupingOutcome {
                entry: EntryId(1),
                group: Some(GroupId(1)),
                patterns: vec![CandidatePattern {
                    position: 0,
                    pattern: Pattern::new(["p", "p", "p"]),
                }],
                skipped: Vec::new(),
                pending: Vec::new(),
            },
        };
        let mut formatter = TextFormatter::new(Vec::new());
        formatter.format_preview(&preview).unwrap();
        let output = String::from_utf8(formatter.into_inner()).unwrap();
        assert_eq!(output, "father (group 1)\n  0: p,p,p\n");
    }
}
