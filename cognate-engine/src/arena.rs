//! Arena storage with opaque, never-reused identifiers
//!
//! Nodes refer to each other by id only. Ids index the arena's slot vector
//! (offset by one so that `0` is never handed out) and a freed slot stays
//! empty, so a stale id can only ever miss, never alias a newer node.

use cognate_core::{DatumId, EntryId, GroupId, VarietyId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Identifier types usable as arena handles
pub trait ArenaId: Copy + Eq + Ord + fmt::Display {
    /// Handle for the slot at `index`
    fn from_index(index: usize) -> Self;
    /// Slot index of this handle
    fn index(self) -> usize;
}

macro_rules! arena_id {
    ($($name:ident),* $(,)?) => {
        $(
            impl ArenaId for $name {
                #[inline]
                fn from_index(index: usize) -> Self {
                    $name(index as u32 + 1)
                }

                #[inline]
                fn index(self) -> usize {
                    (self.0 as usize).wrapping_sub(1)
                }
            }
        )*
    };
}

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
    /// Identifier of a view (an ordered selection of varieties)
    ViewId
);
id_type!(
    /// Identifier of a zone
    ZoneId
);
id_type!(
    /// Identifier of a protosegment
    ProtosegmentId
);
id_type!(
    /// Identifier of an environment-conditioned cluster
    ClusterId
);
id_type!(
    /// Identifier of a correspondence set
    SetId
);
id_type!(
    /// Identifier of a citation
    CitationId
);

arena_id!(
    EntryId,
    VarietyId,
    DatumId,
    GroupId,
    ViewId,
    ZoneId,
    ProtosegmentId,
    ClusterId,
    SetId,
    CitationId,
);

/// Contiguous node storage addressed by `I`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arena<I, T> {
    slots: Vec<Option<T>>,
    #[serde(skip)]
    _id: PhantomData<I>,
}

impl<I, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            _id: PhantomData,
        }
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` and return its handle
    pub fn insert(&mut self, value: T) -> I {
        let id = I::from_index(self.slots.len());
        self.slots.push(Some(value));
        id
    }

    /// Borrow a live node
    pub fn get(&self, id: I) -> Option<&T> {
        self.slots.get(id.index())?.as_ref()
    }

    /// Mutably borrow a live node
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.slots.get_mut(id.index())?.as_mut()
    }

    /// Remove a node; its id is never handed out again
    pub fn remove(&mut self, id: I) -> Option<T> {
        self.slots.get_mut(id.index())?.take()
    }

    /// Put a node back into the slot it was removed from
    pub(crate) fn restore(&mut self, id: I, value: T) {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            *slot = Some(value);
        }
    }

    /// Whether `id` names a live node
    pub fn contains(&self, id: I) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether no node is live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live nodes in id order
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (I::from_index(index), value)))
    }

    /// Mutable access to live nodes in id order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (I, &mut T)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|value| (I::from_index(index), value)))
    }

    /// Handles of live nodes in id order
    pub fn ids(&self) -> Vec<I> {
        self.iter().map(|(id, _)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one() {
        let mut arena: Arena<ZoneId, &str> = Arena::new();
        let first = arena.insert("stops");
        let second = arena.insert("vowels");
        assert_eq!(first, ZoneId(1));
        assert_eq!(second, ZoneId(2));
        assert_eq!(arena.get(first), Some(&"stops"));
    }

    #[test]
    fn test_removed_ids_are_not_reused() {
        let mut arena: Arena<ClusterId, u32> = Arena::new();
        let a = arena.insert(1);
        assert_eq!(arena.remove(a), Some(1));
        let b = arena.insert(2);
        assert_ne!(a, b);
        assert!(arena.get(a).is_none());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_zero_id_never_resolves() {
        let mut arena: Arena<SetId, u32> = Arena::new();
        arena.insert(7);
        assert!(arena.get(SetId(0)).is_none());
    }

    #[test]
    fn test_restore_after_remove() {
        let mut arena: Arena<SetId, u32> = Arena::new();
        let id = arena.insert(7);
        let value = arena.remove(id).unwrap();
        arena.restore(id, value);
        assert_eq!(arena.get(id), Some(&7));
    }
}
