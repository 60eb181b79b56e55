//! Alignment vector codec
//!
//! A vector records, position by position, how one datum lines up with the
//! other forms of its entry. `HOLD` positions carry one source character,
//! `INDEL` and `EXCLUDE` positions carry none. Cluster markers wrap runs of
//! held positions that form a single phoneme; span offsets always index the
//! *skeleton*, i.e. the vector with its markers removed.

use crate::{
    error::{Result, VectorError},
    types::{ClusterSpan, Direction},
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Position occupied by one source character
pub const HOLD: char = '=';
/// Gap: the variety has no reflex at this position
pub const INDEL: char = '-';
/// Position explicitly excluded from comparison
pub const EXCLUDE: char = '!';
/// Opens a grapheme cluster
pub const CLUSTER_START: char = '{';
/// Closes a grapheme cluster
pub const CLUSTER_END: char = '}';

/// Per-position outcome tokens of one aligned display
pub type Tokens = SmallVec<[String; 8]>;

/// Whether `ch` is one of the five reserved vector code points
pub fn is_structural(ch: char) -> bool {
    matches!(ch, HOLD | INDEL | EXCLUDE | CLUSTER_START | CLUSTER_END)
}

/// One skeleton position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    /// Carries a source character
    Hold,
    /// Gap
    Indel,
    /// Excluded from comparison
    Exclude,
}

impl Slot {
    /// The vector symbol for this slot
    pub fn symbol(self) -> char {
        match self {
            Slot::Hold => HOLD,
            Slot::Indel => INDEL,
            Slot::Exclude => EXCLUDE,
        }
    }

    /// Parse a vector symbol found at `position`
    pub fn from_symbol(ch: char, position: usize) -> Result<Self> {
        match ch {
            HOLD => Ok(Slot::Hold),
            INDEL => Ok(Slot::Indel),
            EXCLUDE => Ok(Slot::Exclude),
            _ => Err(VectorError::IllegalVectorCharacter { ch, position }),
        }
    }

    /// Slots that may be typed into a vector by hand
    pub fn from_typed(ch: char, position: usize) -> Result<Self> {
        match ch {
            INDEL => Ok(Slot::Indel),
            EXCLUDE => Ok(Slot::Exclude),
            _ => Err(VectorError::IllegalVectorCharacter { ch, position }),
        }
    }
}

/// Recover the cluster spans of a vector (or of a fused display)
///
/// Every character other than the two markers counts as one position.
pub fn decode_spans(vector: &str) -> Result<Vec<ClusterSpan>> {
    let mut spans = Vec::new();
    let mut pending: Option<usize> = None;
    let mut position = 0;

    for ch in vector.chars() {
        match ch {
            CLUSTER_START => {
                if let Some(open) = pending {
                    return Err(VectorError::malformed(format!(
                        "cluster opened at {position} while cluster from {open} is still open"
                    )));
                }
                pending = Some(position);
            }
            CLUSTER_END => {
                let start = pending.take().ok_or_else(|| {
                    VectorError::malformed(format!("cluster end at {position} without a start"))
                })?;
                if start == position {
                    return Err(VectorError::malformed(format!(
                        "empty cluster at {position}"
                    )));
                }
                spans.push(ClusterSpan::new(start, position));
            }
            _ => position += 1,
        }
    }

    if let Some(open) = pending {
        return Err(VectorError::malformed(format!(
            "cluster opened at {open} is never closed"
        )));
    }

    Ok(spans)
}

/// Write `items` back out with cluster markers around each span
///
/// `spans` must be sorted, disjoint and within range.
fn interleave(items: impl IntoIterator<Item = char>, spans: &[ClusterSpan]) -> String {
    let mut out = String::new();
    let mut next = 0;

    for (position, ch) in items.into_iter().enumerate() {
        if next < spans.len() && spans[next].start == position {
            out.push(CLUSTER_START);
        }
        out.push(ch);
        if next < spans.len() && spans[next].end == position + 1 {
            out.push(CLUSTER_END);
            next += 1;
        }
    }

    out
}

/// Encode a skeleton and its spans as a vector string
pub fn encode(skeleton: &[Slot], spans: &[ClusterSpan]) -> String {
    interleave(skeleton.iter().map(|slot| slot.symbol()), spans)
}

/// Fuse a vector with its source text into the aligned display string
pub fn fuse(vector: &str, source_text: &str) -> Result<String> {
    AlignedVector::parse(vector)?.fuse(source_text)
}

/// Insert a new span, keeping the list sorted by start
pub fn add_cluster(spans: &[ClusterSpan], start: usize, end: usize) -> Result<Vec<ClusterSpan>> {
    let candidate = ClusterSpan::new(start, end);
    if candidate.is_empty() {
        return Err(VectorError::malformed(format!(
            "cluster {candidate} covers no positions"
        )));
    }

    if let Some(existing) = spans.iter().find(|s| s.intersects(&candidate)) {
        return Err(VectorError::Overlap {
            start,
            end,
            existing_start: existing.start,
            existing_end: existing.end,
        });
    }

    let mut out = spans.to_vec();
    let at = out.partition_point(|s| s.start < start);
    out.insert(at, candidate);
    Ok(out)
}

/// Remove `span` if present; neighbours are left alone
pub fn remove_cluster(spans: &[ClusterSpan], span: ClusterSpan) -> Vec<ClusterSpan> {
    spans.iter().copied().filter(|s| *s != span).collect()
}

/// Translate every span starting at or after `offset` by `delta`
///
/// Call this before editing the backing buffer so the spans keep tracking
/// their characters.
pub fn shift_positions(spans: &[ClusterSpan], offset: usize, delta: isize) -> Vec<ClusterSpan> {
    spans
        .iter()
        .map(|s| {
            if s.start >= offset {
                ClusterSpan::new(
                    s.start.saturating_add_signed(delta),
                    s.end.saturating_add_signed(delta),
                )
            } else {
                *s
            }
        })
        .collect()
}

/// Where a cursor at `position` should jump to so a cluster moves as one unit
pub fn next_boundary(
    spans: &[ClusterSpan],
    position: usize,
    direction: Direction,
) -> Option<usize> {
    spans
        .iter()
        .find(|s| s.strictly_contains(position))
        .map(|s| match direction {
            Direction::Forward => s.end,
            Direction::Backward => s.start,
        })
}

/// Reject an insertion that would land inside a cluster
pub fn check_insertion(spans: &[ClusterSpan], position: usize) -> Result<()> {
    match spans.iter().find(|s| s.strictly_contains(position)) {
        Some(s) => Err(VectorError::ClusterViolation {
            position,
            start: s.start,
            end: s.end,
        }),
        None => Ok(()),
    }
}

/// Reject a deletion of a position that belongs to a cluster
pub fn check_removal(spans: &[ClusterSpan], position: usize) -> Result<()> {
    match spans.iter().find(|s| s.contains(position)) {
        Some(s) => Err(VectorError::ClusterViolation {
            position,
            start: s.start,
            end: s.end,
        }),
        None => Ok(()),
    }
}

/// Split an aligned display into per-position outcome tokens
///
/// A cluster yields one token made of its characters, without markers.
pub fn tokenize(display: &str) -> Result<Tokens> {
    let mut tokens = Tokens::new();
    let mut cluster: Option<String> = None;

    for ch in display.chars() {
        match ch {
            CLUSTER_START => {
                if cluster.is_some() {
                    return Err(VectorError::malformed(format!(
                        "nested cluster in {display:?}"
                    )));
                }
                cluster = Some(String::new());
            }
            CLUSTER_END => {
                let text = cluster.take().ok_or_else(|| {
                    VectorError::malformed(format!("cluster end without a start in {display:?}"))
                })?;
                if text.is_empty() {
                    return Err(VectorError::malformed(format!(
                        "empty cluster in {display:?}"
                    )));
                }
                tokens.push(text);
            }
            _ => match cluster.as_mut() {
                Some(text) => text.push(ch),
                None => tokens.push(ch.to_string()),
            },
        }
    }

    if cluster.is_some() {
        return Err(VectorError::malformed(format!(
            "unclosed cluster in {display:?}"
        )));
    }

    Ok(tokens)
}

/// A parsed vector: skeleton slots plus sorted, disjoint cluster spans
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AlignedVector {
    slots: Vec<Slot>,
    spans: Vec<ClusterSpan>,
}

impl AlignedVector {
    /// A vector holding every character of a `len`-character datum
    pub fn all_hold(len: usize) -> Self {
        Self {
            slots: vec![Slot::Hold; len],
            spans: Vec::new(),
        }
    }

    /// Build from an explicit skeleton and span list
    pub fn from_parts(slots: Vec<Slot>, spans: Vec<ClusterSpan>) -> Result<Self> {
        let mut vector = Self {
            slots,
            spans: Vec::with_capacity(spans.len()),
        };
        for span in spans {
            vector.define_cluster(span.start, span.end)?;
        }
        Ok(vector)
    }

    /// Parse a vector string
    pub fn parse(vector: &str) -> Result<Self> {
        let spans = decode_spans(vector)?;
        let slots = vector
            .chars()
            .filter(|ch| !matches!(*ch, CLUSTER_START | CLUSTER_END))
            .enumerate()
            .map(|(position, ch)| Slot::from_symbol(ch, position))
            .collect::<Result<Vec<_>>>()?;
        Self::from_parts(slots, spans)
    }

    /// Skeleton slots
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Cluster spans, sorted by start
    pub fn spans(&self) -> &[ClusterSpan] {
        &self.spans
    }

    /// Number of skeleton positions
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the skeleton is empty
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of positions carrying a source character
    pub fn hold_count(&self) -> usize {
        self.slots.iter().filter(|s| **s == Slot::Hold).count()
    }

    /// Skeleton position of the `char_index`-th source character
    ///
    /// One past the last character maps to the end of the skeleton.
    pub fn hold_position(&self, char_index: usize) -> Option<usize> {
        let found = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| **slot == Slot::Hold)
            .map(|(position, _)| position)
            .nth(char_index);
        match found {
            Some(position) => Some(position),
            None if char_index == self.hold_count() => Some(self.slots.len()),
            None => None,
        }
    }

    /// Type an `INDEL` or `EXCLUDE` symbol at `position`
    pub fn insert_symbol(&mut self, position: usize, ch: char) -> Result<()> {
        let slot = Slot::from_typed(ch, position)?;
        self.check_insert_position(position)?;
        check_insertion(&self.spans, position)?;
        self.spans = shift_positions(&self.spans, position, 1);
        self.slots.insert(position, slot);
        Ok(())
    }

    /// Delete the `INDEL` or `EXCLUDE` symbol at `position`
    pub fn remove_symbol(&mut self, position: usize) -> Result<char> {
        self.check_existing_position(position)?;
        let slot = self.slots[position];
        if slot == Slot::Hold {
            return Err(VectorError::IllegalVectorCharacter { ch: HOLD, position });
        }
        check_removal(&self.spans, position)?;
        self.spans = shift_positions(&self.spans, position, -1);
        self.slots.remove(position);
        Ok(slot.symbol())
    }

    /// Insert `count` held positions at `position` (source text grew)
    pub fn insert_holds(&mut self, position: usize, count: usize) -> Result<()> {
        self.check_insert_position(position)?;
        check_insertion(&self.spans, position)?;
        self.spans = shift_positions(&self.spans, position, count as isize);
        self.slots
            .splice(position..position, std::iter::repeat(Slot::Hold).take(count));
        Ok(())
    }

    /// Remove held positions (source text shrank)
    ///
    /// Either every position is removed or none is.
    pub fn remove_holds(&mut self, positions: &[usize]) -> Result<()> {
        for &position in positions {
            self.check_existing_position(position)?;
            if self.slots[position] != Slot::Hold {
                return Err(VectorError::IllegalVectorCharacter {
                    ch: self.slots[position].symbol(),
                    position,
                });
            }
            check_removal(&self.spans, position)?;
        }

        let mut ordered = positions.to_vec();
        ordered.sort_unstable_by(|a, b| b.cmp(a));
        ordered.dedup();
        for position in ordered {
            self.spans = shift_positions(&self.spans, position, -1);
            self.slots.remove(position);
        }
        Ok(())
    }

    /// Mark `[start, end)` as one grapheme cluster
    pub fn define_cluster(&mut self, start: usize, end: usize) -> Result<()> {
        if end > self.slots.len() {
            return Err(VectorError::malformed(format!(
                "cluster [{start}, {end}) exceeds vector length {}",
                self.slots.len()
            )));
        }
        if let Some(offset) = self
            .slots
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .position(|slot| *slot != Slot::Hold)
        {
            return Err(VectorError::malformed(format!(
                "cluster [{start}, {end}) covers a gap at {}",
                start + offset
            )));
        }
        self.spans = add_cluster(&self.spans, start, end)?;
        Ok(())
    }

    /// Drop a cluster; returns whether it existed
    pub fn remove_cluster(&mut self, span: ClusterSpan) -> bool {
        let before = self.spans.len();
        self.spans = remove_cluster(&self.spans, span);
        self.spans.len() != before
    }

    /// Cursor target for `position`, see [`next_boundary`]
    pub fn next_boundary(&self, position: usize, direction: Direction) -> Option<usize> {
        next_boundary(&self.spans, position, direction)
    }

    /// Fuse with the source text
    pub fn fuse(&self, source_text: &str) -> Result<String> {
        let char_count = source_text.chars().count();
        if char_count != self.hold_count() {
            return Err(VectorError::malformed(format!(
                "vector holds {} characters but the datum has {char_count}",
                self.hold_count()
            )));
        }

        Ok(self.render(source_text))
    }

    /// Fuse without checking the character count
    pub(crate) fn render(&self, source_text: &str) -> String {
        let mut chars = source_text.chars();
        let items = self.slots.iter().map(|slot| match slot {
            Slot::Hold => chars.next().unwrap_or(HOLD),
            other => other.symbol(),
        });
        interleave(items, &self.spans)
    }

    fn check_insert_position(&self, position: usize) -> Result<()> {
        if position > self.slots.len() {
            return Err(self.out_of_range(position));
        }
        Ok(())
    }

    fn check_existing_position(&self, position: usize) -> Result<()> {
        if position >= self.slots.len() {
            return Err(self.out_of_range(position));
        }
        Ok(())
    }

    fn out_of_range(&self, position: usize) -> VectorError {
        VectorError::malformed(format!(
            "position {position} is outside the vector (length {})",
            self.slots.len()
        ))
    }
}

impl fmt::Display for AlignedVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(&self.slots, &self.spans))
    }
}

impl TryFrom<String> for AlignedVector {
    type Error = VectorError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<AlignedVector> for String {
    fn from(value: AlignedVector) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_spans_simple() {
        let spans = decode_spans("{==}=").unwrap();
        assert_eq!(spans, vec![ClusterSpan::new(0, 2)]);
    }

    #[test]
    fn test_decode_spans_unbalanced() {
        assert!(matches!(
            decode_spans("{=="),
            Err(VectorError::MalformedVector { .. })
        ));
        assert!(matches!(
            decode_spans("==}"),
            Err(VectorError::MalformedVector { .. })
        ));
        assert!(matches!(
            decode_spans("{={=}}"),
            Err(VectorError::MalformedVector { .. })
        ));
    }

    #[test]
    fn test_cluster_definition_scenario() {
        let mut vector = AlignedVector::parse("===").unwrap();
        vector.define_cluster(0, 2).unwrap();

        let display = vector.fuse("kʷa").unwrap();
        assert_eq!(display, "{kʷ}a");
        assert_eq!(vector.next_boundary(1, Direction::Forward), Some(2));
        assert_eq!(vector.next_boundary(1, Direction::Backward), Some(0));
        assert_eq!(vector.next_boundary(0, Direction::Forward), None);
        assert_eq!(vector.next_boundary(2, Direction::Forward), None);
    }

    #[test]
    fn test_fuse_emits_gap_symbols() {
        assert_eq!(fuse("=-=!", "ta").unwrap(), "t-a!");
    }

    #[test]
    fn test_fuse_rejects_length_disagreement() {
        assert!(fuse("==", "abc").is_err());
    }

    #[test]
    fn test_add_cluster_rejects_overlap() {
        let spans = add_cluster(&[], 1, 3).unwrap();
        let err = add_cluster(&spans, 2, 4).unwrap_err();
        assert_eq!(
            err,
            VectorError::Overlap {
                start: 2,
                end: 4,
                existing_start: 1,
                existing_end: 3
            }
        );
    }

    #[test]
    fn test_add_cluster_keeps_order() {
        let spans = add_cluster(&[], 4, 6).unwrap();
        let spans = add_cluster(&spans, 0, 2).unwrap();
        assert_eq!(spans, vec![ClusterSpan::new(0, 2), ClusterSpan::new(4, 6)]);
    }

    #[test]
    fn test_adjacent_clusters_are_allowed() {
        let spans = add_cluster(&[], 0, 2).unwrap();
        let spans = add_cluster(&spans, 2, 4).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(remove_cluster(&spans, ClusterSpan::new(0, 2)).len(), 1);
    }

    #[test]
    fn test_shift_positions() {
        let spans = vec![ClusterSpan::new(0, 2), ClusterSpan::new(4, 6)];
        let shifted = shift_positions(&spans, 3, 2);
        assert_eq!(
            shifted,
            vec![ClusterSpan::new(0, 2), ClusterSpan::new(6, 8)]
        );
    }

    #[test]
    fn test_insert_symbol_rules() {
        let mut vector = AlignedVector::parse("{==}=").unwrap();

        let err = vector.insert_symbol(1, INDEL).unwrap_err();
        assert!(matches!(err, VectorError::ClusterViolation { .. }));

        let err = vector.insert_symbol(0, 'x').unwrap_err();
        assert_eq!(
            err,
            VectorError::IllegalVectorCharacter { ch: 'x', position: 0 }
        );

        vector.insert_symbol(0, INDEL).unwrap();
        assert_eq!(vector.to_string(), "-{==}=");
        vector.insert_symbol(3, EXCLUDE).unwrap();
        assert_eq!(vector.to_string(), "-{==}!=");
    }

    #[test]
    fn test_remove_symbol_rules() {
        let mut vector = AlignedVector::parse("-{==}").unwrap();
        assert!(matches!(
            vector.remove_symbol(1),
            Err(VectorError::IllegalVectorCharacter { ch: HOLD, .. })
        ));
        assert_eq!(vector.remove_symbol(0).unwrap(), INDEL);
        assert_eq!(vector.to_string(), "{==}");
    }

    #[test]
    fn test_cluster_over_gap_rejected() {
        let mut vector = AlignedVector::parse("=-=").unwrap();
        assert!(vector.define_cluster(0, 3).is_err());
        assert!(vector.spans().is_empty());
    }

    #[test]
    fn test_tokenize_clusters() {
        let tokens = tokenize("{kʷ}a-").unwrap();
        assert_eq!(tokens.as_slice(), ["kʷ", "a", "-"]);
    }

    #[test]
    fn test_tokenize_rejects_unclosed() {
        assert!(tokenize("{ka").is_err());
        assert!(tokenize("k}a").is_err());
    }

    #[test]
    fn test_string_conversion_roundtrip() {
        let vector = AlignedVector::parse("{==}-").unwrap();
        let as_string: String = vector.clone().into();
        assert_eq!(as_string, "{==}-");
        assert_eq!(AlignedVector::try_from(as_string).unwrap(), vector);
    }

    #[test]
    fn test_remove_holds_is_all_or_nothing() {
        let mut vector = AlignedVector::parse("{==}=-").unwrap();
        assert!(vector.remove_holds(&[2, 0]).is_err());
        assert_eq!(vector.to_string(), "{==}=-");

        vector.remove_holds(&[2]).unwrap();
        assert_eq!(vector.to_string(), "{==}-");
    }
}
