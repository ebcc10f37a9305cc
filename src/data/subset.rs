//! Subset packages: which rows of a dataset flow along an edge, and how they
//! should be drawn.

use crate::data::dataset::TabularDataset;
use crate::data::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-row rendering overrides. Unset fields fall back to the chart defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f64>,
}

impl VisualProperties {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite every field that `other` sets.
    pub fn merge(&mut self, other: &VisualProperties) {
        if other.opacity.is_some() {
            self.opacity = other.opacity;
        }
        if other.color.is_some() {
            self.color.clone_from(&other.color);
        }
        if other.size.is_some() {
            self.size = other.size;
        }
        if other.border_color.is_some() {
            self.border_color.clone_from(&other.border_color);
        }
        if other.border_width.is_some() {
            self.border_width = other.border_width;
        }
    }

    pub fn merged(mut self, other: &VisualProperties) -> Self {
        self.merge(other);
        self
    }
}

/// One row in a subset together with its visual properties.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetItem {
    pub index: usize,
    pub visuals: VisualProperties,
}

impl SubsetItem {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            visuals: VisualProperties::default(),
        }
    }

    pub fn with_visuals(index: usize, visuals: VisualProperties) -> Self {
        Self { index, visuals }
    }
}

/// A subset of one dataset's rows.
///
/// Every key of `items` is a valid row index of `dataset`. Without a dataset
/// the package holds no items.
#[derive(Debug, Clone, Default)]
pub struct SubsetPackage {
    dataset: Option<Arc<TabularDataset>>,
    items: BTreeMap<usize, SubsetItem>,
}

impl SubsetPackage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A package over `dataset` with no rows selected yet.
    pub fn with_dataset(dataset: Arc<TabularDataset>) -> Self {
        Self {
            dataset: Some(dataset),
            items: BTreeMap::new(),
        }
    }

    /// A package holding every row of `dataset` with default visuals.
    pub fn full(dataset: Arc<TabularDataset>) -> Self {
        let items = (0..dataset.num_rows())
            .map(|index| (index, SubsetItem::new(index)))
            .collect();
        Self {
            dataset: Some(dataset),
            items,
        }
    }

    pub fn dataset(&self) -> Option<&Arc<TabularDataset>> {
        self.dataset.as_ref()
    }

    /// Add an item, merging its visuals into an existing entry for the same row.
    ///
    /// Indices outside the dataset are ignored.
    pub fn add_item(&mut self, item: SubsetItem) {
        let Some(dataset) = &self.dataset else {
            tracing::warn!("Ignoring item {} added to a package without data", item.index);
            return;
        };
        if item.index >= dataset.num_rows() {
            tracing::warn!(
                "Ignoring item {} beyond dataset '{}' ({} rows)",
                item.index,
                dataset.name(),
                dataset.num_rows()
            );
            return;
        }
        match self.items.get_mut(&item.index) {
            Some(existing) => existing.visuals.merge(&item.visuals),
            None => {
                self.items.insert(item.index, item);
            }
        }
    }

    pub fn remove_item(&mut self, index: usize) -> Option<SubsetItem> {
        self.items.remove(&index)
    }

    pub fn get_item(&self, index: usize) -> Option<&SubsetItem> {
        self.items.get(&index)
    }

    pub fn get_item_mut(&mut self, index: usize) -> Option<&mut SubsetItem> {
        self.items.get_mut(&index)
    }

    pub fn has_item(&self, index: usize) -> bool {
        self.items.contains_key(&index)
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when no dataset is attached.
    pub fn has_no_data(&self) -> bool {
        self.dataset.is_none()
    }

    /// Items in ascending row order.
    pub fn items(&self) -> impl Iterator<Item = &SubsetItem> {
        self.items.values()
    }

    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut SubsetItem> {
        self.items.values_mut()
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.items.keys().copied()
    }

    /// Replace this package's contents with a copy of `other`.
    pub fn copy_from(&mut self, other: &SubsetPackage) {
        self.dataset = other.dataset.clone();
        self.items = other.items.clone();
    }

    /// Same dataset, no items.
    pub fn emptied(&self) -> SubsetPackage {
        SubsetPackage {
            dataset: self.dataset.clone(),
            items: BTreeMap::new(),
        }
    }

    /// Keep only the listed rows.
    pub fn filter(&mut self, keep: impl IntoIterator<Item = usize>) {
        let keep: std::collections::HashSet<usize> = keep.into_iter().collect();
        self.items.retain(|index, _| keep.contains(index));
    }

    pub fn clear_items(&mut self) {
        self.items.clear();
    }

    /// Two packages can be combined when either lacks data or both refer to
    /// the same rows.
    pub fn is_compatible(&self, other: &SubsetPackage) -> bool {
        match (&self.dataset, &other.dataset) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b) || a.same_data(b),
            _ => true,
        }
    }

    /// Identity of the underlying rows, if any.
    pub fn data_id(&self) -> Option<&str> {
        self.dataset.as_deref().map(TabularDataset::data_id)
    }

    pub fn value(&self, index: usize, dim: usize) -> Option<&Value> {
        self.dataset.as_deref().and_then(|d| d.value(index, dim))
    }

    /// Row indices grouped by the value of `group_by`, in first-seen order.
    /// Without a grouping dimension every item falls in one group.
    pub fn group_items(&self, group_by: Option<usize>) -> Vec<Vec<usize>> {
        let Some(dim) = group_by else {
            return vec![self.indices().collect()];
        };
        let mut order: Vec<String> = Vec::new();
        let mut groups: std::collections::HashMap<String, Vec<usize>> =
            std::collections::HashMap::new();
        for index in self.indices() {
            let key = self
                .value(index, dim)
                .map(|v| v.to_string())
                .unwrap_or_default();
            groups
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(index);
        }
        order
            .into_iter()
            .filter_map(|key| groups.remove(&key))
            .collect()
    }
}

impl PartialEq for SubsetPackage {
    fn eq(&self, other: &Self) -> bool {
        self.data_id() == other.data_id() && self.items == other.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Arc<TabularDataset> {
        Arc::new(TabularDataset::parse_csv("t", "a,b\n1,x\n2,y\n3,x\n").unwrap())
    }

    fn red() -> VisualProperties {
        VisualProperties {
            color: Some("red".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_add_item_merges_visuals() {
        let mut pack = SubsetPackage::with_dataset(dataset());
        pack.add_item(SubsetItem::with_visuals(0, red()));
        pack.add_item(SubsetItem::with_visuals(
            0,
            VisualProperties {
                size: Some(3.0),
                ..Default::default()
            },
        ));
        let item = pack.get_item(0).unwrap();
        assert_eq!(item.visuals.color.as_deref(), Some("red"));
        assert_eq!(item.visuals.size, Some(3.0));
        assert_eq!(pack.num_items(), 1);
    }

    #[test]
    fn test_out_of_range_items_ignored() {
        let mut pack = SubsetPackage::with_dataset(dataset());
        pack.add_item(SubsetItem::new(10));
        assert!(pack.is_empty());

        let mut no_data = SubsetPackage::new();
        no_data.add_item(SubsetItem::new(0));
        assert!(no_data.is_empty());
    }

    #[test]
    fn test_full_and_filter() {
        let mut pack = SubsetPackage::full(dataset());
        assert_eq!(pack.num_items(), 3);
        pack.filter([0, 2]);
        assert_eq!(pack.indices().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_copy_is_independent() {
        let source = SubsetPackage::full(dataset());
        let mut copy = SubsetPackage::new();
        copy.copy_from(&source);
        copy.remove_item(1);
        assert_eq!(source.num_items(), 3);
        assert_eq!(copy.num_items(), 2);
    }

    #[test]
    fn test_group_items() {
        let pack = SubsetPackage::full(dataset());
        assert_eq!(pack.group_items(Some(1)), vec![vec![0, 2], vec![1]]);
        assert_eq!(pack.group_items(None), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_compatibility() {
        let a = SubsetPackage::full(dataset());
        let other = Arc::new(TabularDataset::parse_csv("o", "a,b\n9,z\n").unwrap());
        assert!(a.is_compatible(&SubsetPackage::new()));
        assert!(a.is_compatible(&SubsetPackage::full(dataset())));
        assert!(!a.is_compatible(&SubsetPackage::full(other)));
    }
}
