//! Selected rows of a visualization.

use crate::data::subset::SubsetPackage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Row indices the user selected in a visualization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubsetSelection {
    items: BTreeSet<usize>,
}

impl SubsetSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, index: usize) {
        self.items.insert(index);
    }

    pub fn remove(&mut self, index: usize) {
        self.items.remove(&index);
    }

    pub fn toggle(&mut self, index: usize) {
        if !self.items.remove(&index) {
            self.items.insert(index);
        }
    }

    pub fn has_item(&self, index: usize) -> bool {
        self.items.contains(&index)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.items.iter().copied()
    }

    /// Drop selected rows that `parent` no longer contains.
    pub fn retain_present(&mut self, parent: &SubsetPackage) {
        self.items.retain(|index| parent.has_item(*index));
    }

    /// Copy the selected items out of `parent`, keeping their visuals.
    ///
    /// Selected rows missing from `parent` are skipped.
    pub fn to_subset_package(&self, parent: &SubsetPackage) -> SubsetPackage {
        let mut pack = parent.emptied();
        for index in &self.items {
            if let Some(item) = parent.get_item(*index) {
                pack.add_item(item.clone());
            }
        }
        pack
    }
}

impl FromIterator<usize> for SubsetSelection {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::TabularDataset;
    use std::sync::Arc;

    #[test]
    fn test_to_subset_package_skips_missing() {
        let data = Arc::new(TabularDataset::parse_csv("t", "a\n1\n2\n3\n").unwrap());
        let mut parent = SubsetPackage::full(data);
        parent.remove_item(1);

        let selection: SubsetSelection = [0, 1, 2].into_iter().collect();
        let pack = selection.to_subset_package(&parent);
        assert_eq!(pack.indices().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(pack.data_id(), parent.data_id());
    }

    #[test]
    fn test_toggle_and_retain() {
        let data = Arc::new(TabularDataset::parse_csv("t", "a\n1\n2\n").unwrap());
        let mut parent = SubsetPackage::full(data);
        let mut selection = SubsetSelection::new();
        selection.toggle(0);
        selection.toggle(1);
        selection.toggle(0);
        assert!(!selection.has_item(0));
        parent.remove_item(1);
        selection.retain_present(&parent);
        assert!(selection.is_empty());
    }
}
