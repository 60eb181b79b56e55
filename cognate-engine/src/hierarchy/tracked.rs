//! Last-saved snapshots for dirty tracking and revert

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An entity together with the state last accepted by the backend
///
/// A node that was never saved has no snapshot; reverting it means dropping
/// it altogether.
#[derive(Debug, Clone, PartialEq)]
pub struct Tracked<T> {
    current: T,
    saved: Option<T>,
}

impl<T: Clone + PartialEq> Tracked<T> {
    /// A node created in memory and not yet saved
    pub fn unsaved(value: T) -> Self {
        Self {
            current: value,
            saved: None,
        }
    }

    /// A node whose current state is already persisted
    pub fn saved(value: T) -> Self {
        Self {
            saved: Some(value.clone()),
            current: value,
        }
    }

    /// Current state
    pub fn current(&self) -> &T {
        &self.current
    }

    pub(crate) fn current_mut(&mut self) -> &mut T {
        &mut self.current
    }

    /// Whether the current state differs from the last save
    pub fn is_dirty(&self) -> bool {
        self.saved.as_ref() != Some(&self.current)
    }

    /// Whether the node has never been saved
    pub fn is_new(&self) -> bool {
        self.saved.is_none()
    }

    pub(crate) fn mark_saved(&mut self) {
        self.saved = Some(self.current.clone());
    }

    /// Restore the last saved state; `false` when there is none
    pub(crate) fn revert(&mut self) -> bool {
        match &self.saved {
            Some(saved) => {
                self.current = saved.clone();
                true
            }
            None => false,
        }
    }
}

impl<T: Serialize> Serialize for Tracked<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.current.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Tracked<T>
where
    T: Deserialize<'de> + Clone + PartialEq,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Tracked::saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_is_dirty() {
        let node = Tracked::unsaved(1);
        assert!(node.is_new());
        assert!(node.is_dirty());
    }

    #[test]
    fn test_revert_restores_snapshot() {
        let mut node = Tracked::saved(1);
        *node.current_mut() = 2;
        assert!(node.is_dirty());
        assert!(node.revert());
        assert_eq!(*node.current(), 1);
        assert!(!node.is_dirty());
    }

    #[test]
    fn test_revert_without_snapshot() {
        let mut node = Tracked::unsaved(1);
        assert!(!node.revert());
    }

    #[test]
    fn test_deserialized_nodes_are_clean() {
        let node: Tracked<u32> = serde_json::from_str("5").unwrap();
        assert!(!node.is_dirty());
        assert_eq!(serde_json::to_string(&node).unwrap(), "5");
    }
}
