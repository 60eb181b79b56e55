//! Per-datum aligned values

use crate::{
    error::{Result, VectorError},
    pattern,
    types::{ClusterSpan, DatumId, GroupId, VarietyId},
    vector::{self, AlignedVector, Tokens},
};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// The aligned value of one datum inside one view
///
/// The fused display string is cached and dropped whenever the vector or the
/// source text changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "AlignmentData", into = "AlignmentData")]
pub struct AlignmentRecord {
    datum: DatumId,
    variety: VarietyId,
    source: String,
    vector: AlignedVector,
    group: Option<GroupId>,
    display: OnceLock<String>,
}

/// Serialized form of an [`AlignmentRecord`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentData {
    /// Datum being aligned
    pub datum: DatumId,
    /// Variety the datum belongs to
    pub variety: VarietyId,
    /// Source transcription
    pub source: String,
    /// Vector string
    pub vector: AlignedVector,
    /// Correspondence group tag
    #[serde(default)]
    pub group: Option<GroupId>,
}

impl TryFrom<AlignmentData> for AlignmentRecord {
    type Error = VectorError;

    fn try_from(data: AlignmentData) -> Result<Self> {
        let mut record = Self::with_vector(data.datum, data.variety, data.source, data.vector)?;
        record.group = data.group;
        Ok(record)
    }
}

impl From<AlignmentRecord> for AlignmentData {
    fn from(record: AlignmentRecord) -> Self {
        Self {
            datum: record.datum,
            variety: record.variety,
            source: record.source,
            vector: record.vector,
            group: record.group,
        }
    }
}

impl PartialEq for AlignmentRecord {
    fn eq(&self, other: &Self) -> bool {
        self.datum == other.datum
            && self.variety == other.variety
            && self.source == other.source
            && self.vector == other.vector
            && self.group == other.group
    }
}

impl Eq for AlignmentRecord {}

/// Reject text holding vector symbols or characters reserved in patterns
pub fn check_text(text: &str) -> Result<()> {
    let illegal = |ch: char| vector::is_structural(ch) || pattern::is_reserved(ch);
    match text.chars().enumerate().find(|(_, ch)| illegal(*ch)) {
        Some((position, ch)) => Err(VectorError::IllegalVectorCharacter { ch, position }),
        None => Ok(()),
    }
}

fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

impl AlignmentRecord {
    /// Align a datum for the first time: every character held
    pub fn new(datum: DatumId, variety: VarietyId, source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let vector = AlignedVector::all_hold(source.chars().count());
        Self::with_vector(datum, variety, source, vector)
    }

    /// Build a record around an existing vector
    pub fn with_vector(
        datum: DatumId,
        variety: VarietyId,
        source: impl Into<String>,
        vector: AlignedVector,
    ) -> Result<Self> {
        let source = source.into();
        check_text(&source)?;
        vector.fuse(&source)?;
        Ok(Self {
            datum,
            variety,
            source,
            vector,
            group: None,
            display: OnceLock::new(),
        })
    }

    /// Datum being aligned
    pub fn datum(&self) -> DatumId {
        self.datum
    }

    /// Variety of the datum
    pub fn variety(&self) -> VarietyId {
        self.variety
    }

    /// Source transcription
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Current vector
    pub fn vector(&self) -> &AlignedVector {
        &self.vector
    }

    /// Correspondence group, if tagged
    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    /// Tag or untag the record
    pub fn set_group(&mut self, group: Option<GroupId>) {
        self.group = group;
    }

    /// Replace the vector wholesale
    pub fn set_vector(&mut self, vector: AlignedVector) -> Result<()> {
        vector.fuse(&self.source)?;
        self.vector = vector;
        self.invalidate();
        Ok(())
    }

    /// Type a gap or exclusion symbol into the vector
    pub fn insert_gap(&mut self, position: usize, ch: char) -> Result<()> {
        self.vector.insert_symbol(position, ch)?;
        self.invalidate();
        Ok(())
    }

    /// Delete a gap or exclusion symbol from the vector
    pub fn remove_gap(&mut self, position: usize) -> Result<char> {
        let ch = self.vector.remove_symbol(position)?;
        self.invalidate();
        Ok(ch)
    }

    /// Group `[start, end)` into one phoneme
    pub fn define_cluster(&mut self, start: usize, end: usize) -> Result<()> {
        self.vector.define_cluster(start, end)?;
        self.invalidate();
        Ok(())
    }

    /// Ungroup a cluster; returns whether it existed
    pub fn remove_cluster(&mut self, span: ClusterSpan) -> bool {
        let removed = self.vector.remove_cluster(span);
        if removed {
            self.invalidate();
        }
        removed
    }

    /// Insert `text` before the `char_offset`-th source character
    ///
    /// The vector grows by one held position per inserted character; spans
    /// after the insertion point move along before the text is touched.
    pub fn insert_text(&mut self, char_offset: usize, text: &str) -> Result<()> {
        check_text(text)?;
        let position = self
            .vector
            .hold_position(char_offset)
            .ok_or_else(|| self.text_out_of_range(char_offset))?;

        let mut vector = self.vector.clone();
        vector.insert_holds(position, text.chars().count())?;

        let at = byte_offset(&self.source, char_offset);
        self.source.insert_str(at, text);
        self.vector = vector;
        self.invalidate();
        Ok(())
    }

    /// Delete `len` source characters starting at `char_offset`
    pub fn delete_text(&mut self, char_offset: usize, len: usize) -> Result<String> {
        let char_count = self.source.chars().count();
        if char_offset + len > char_count {
            return Err(self.text_out_of_range(char_offset + len));
        }

        let positions = (char_offset..char_offset + len)
            .map(|i| {
                self.vector
                    .hold_position(i)
                    .ok_or_else(|| self.text_out_of_range(i))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut vector = self.vector.clone();
        vector.remove_holds(&positions)?;

        let start = byte_offset(&self.source, char_offset);
        let end = byte_offset(&self.source, char_offset + len);
        let removed: String = self.source.drain(start..end).collect();
        self.vector = vector;
        self.invalidate();
        Ok(removed)
    }

    /// Fused display: source characters, gap symbols and cluster markers
    pub fn aligned_display(&self) -> &str {
        self.display.get_or_init(|| self.vector.render(&self.source))
    }

    /// Per-position outcome tokens of the display
    pub fn tokens(&self) -> Result<Tokens> {
        vector::tokenize(self.aligned_display())
    }

    fn invalidate(&mut self) {
        self.display.take();
    }

    fn text_out_of_range(&self, char_offset: usize) -> VectorError {
        VectorError::MalformedVector {
            reason: format!(
                "character offset {char_offset} is outside datum {} ({} characters)",
                self.datum,
                self.source.chars().count()
            ),
        }
    }
}
