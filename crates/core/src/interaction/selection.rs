use std::collections::BTreeSet;

use crate::project::ItemRef;

/// Selected keyframes and clips. Holds references only; the tracks own the
/// items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    items: BTreeSet<ItemRef>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item: ItemRef) -> bool {
        self.items.contains(&item)
    }

    pub fn iter(&self) -> impl Iterator<Item = ItemRef> + '_ {
        self.items.iter().copied()
    }

    pub fn insert(&mut self, item: ItemRef) {
        self.items.insert(item);
    }

    pub fn remove(&mut self, item: ItemRef) {
        self.items.remove(&item);
    }

    /// Flips membership and returns whether the item is now selected.
    pub fn toggle(&mut self, item: ItemRef) -> bool {
        if self.items.remove(&item) {
            false
        } else {
            self.items.insert(item);
            true
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Makes `item` the only selected item.
    pub fn select_only(&mut self, item: ItemRef) {
        self.items.clear();
        self.items.insert(item);
    }

    pub fn replace(&mut self, items: impl IntoIterator<Item = ItemRef>) {
        self.items = items.into_iter().collect();
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = ItemRef>) {
        self.items.extend(items);
    }

    /// Drops items for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(ItemRef) -> bool) {
        self.items.retain(|item| keep(*item));
    }
}
