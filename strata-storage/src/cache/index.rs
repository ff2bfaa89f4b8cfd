//! Containment index: child id to parent id, with the reverse mapping kept
//! as a sorted list per parent for cascades.

use std::collections::HashMap;

use strata_core::Snowflake;

/// Parent lookup for one nestable kind.
#[derive(Debug, Clone, Default)]
pub struct ContainmentIndex {
    parents: HashMap<Snowflake, Snowflake>,
    children: HashMap<Snowflake, Vec<Snowflake>>,
}

impl ContainmentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `child` under `parent`. Returns the previous parent, if any.
    pub fn set_parent(&mut self, child: Snowflake, parent: Snowflake) -> Option<Snowflake> {
        let previous = self.parents.insert(child, parent);
        if previous == Some(parent) {
            return previous;
        }
        if let Some(old) = previous {
            self.unlink(child, old);
        }
        let list = self.children.entry(parent).or_default();
        let pos = list.binary_search(&child).unwrap_or_else(|p| p);
        list.insert(pos, child);
        previous
    }

    pub fn parent_of(&self, child: Snowflake) -> Option<Snowflake> {
        self.parents.get(&child).copied()
    }

    /// Forget `child`. Returns the parent it was recorded under.
    pub fn remove(&mut self, child: Snowflake) -> Option<Snowflake> {
        let parent = self.parents.remove(&child)?;
        self.unlink(child, parent);
        Some(parent)
    }

    /// Children recorded under `parent`, sorted.
    pub fn children_of(&self, parent: Snowflake) -> &[Snowflake] {
        self.children
            .get(&parent)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Every `(child, parent)` pair, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Snowflake, Snowflake)> + '_ {
        self.parents.iter().map(|(child, parent)| (*child, *parent))
    }

    pub fn contains(&self, child: Snowflake) -> bool {
        self.parents.contains_key(&child)
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    fn unlink(&mut self, child: Snowflake, parent: Snowflake) {
        if let Some(list) = self.children.get_mut(&parent) {
            if let Ok(pos) = list.binary_search(&child) {
                list.remove(pos);
            }
            if list.is_empty() {
                self.children.remove(&parent);
            }
        }
    }
}
