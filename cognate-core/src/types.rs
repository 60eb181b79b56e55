//! Core types shared by the codec, the grouper and the engine

use core::fmt;
use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a lexical entry (a meaning compared across varieties)
    EntryId
);
id_type!(
    /// Identifier of a language variety
    VarietyId
);
id_type!(
    /// Identifier of one transcribed form of an entry in a variety
    DatumId
);
id_type!(
    /// Identifier of a correspondence group
    GroupId
);

/// Direction of cursor travel through an aligned string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Towards the end of the string
    Forward,
    /// Towards the start of the string
    Backward,
}

/// Half-open `[start, end)` range of skeleton positions forming one phoneme
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterSpan {
    /// First position inside the cluster
    pub start: usize,
    /// One past the last position inside the cluster
    pub end: usize,
}

impl ClusterSpan {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of positions covered
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers nothing
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `position` is covered by the span
    pub fn contains(&self, position: usize) -> bool {
        self.start <= position && position < self.end
    }

    /// Whether `position` lies strictly between the span's edges
    pub fn strictly_contains(&self, position: usize) -> bool {
        self.start < position && position < self.end
    }

    /// Whether two spans share at least one position
    pub fn intersects(&self, other: &ClusterSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for ClusterSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
