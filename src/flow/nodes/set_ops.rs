//! Set operator nodes: Union, Intersect and Minus.
//!
//! The three operators share one node type, [`SetNode`], parameterised by a
//! [`SetStrategy`] that declares the ports and computes the output. The
//! algorithms themselves are free functions so they can be used (and
//! benchmarked) without a dataflow.
//!
//! Inputs without a dataset are ignored. An empty input that still has a
//! dataset adds nothing to a union but empties an intersection. Outputs keep
//! the dataset of their inputs even when no items survive.
//!
//! Only inputs with items are checked for compatibility. They must all refer
//! to the same rows; anything else is a [`FlowError::DatasetMismatch`].

use crate::data::{PackageKind, SubsetPackage};
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::node::{NodeContext, NodePlugin, ProcessOutcome};
use crate::flow::node_type::NodeType;
use crate::flow::port::PortDescriptor;
use std::marker::PhantomData;

/// Inputs gathered for a set operation, in connection order.
#[derive(Debug, Default)]
pub struct SetInputs<'a> {
    /// Distinguished input (Minus's subtract-from port).
    pub primary: Option<&'a SubsetPackage>,
    pub others: Vec<&'a SubsetPackage>,
}

/// Per-operator behaviour of a [`SetNode`].
pub trait SetStrategy: Send + 'static {
    const NODE_TYPE: NodeType;
    const PORTS: &'static [PortDescriptor];

    fn inputs<'a>(ctx: &NodeContext<'a>) -> FlowResult<SetInputs<'a>> {
        Ok(SetInputs {
            primary: None,
            others: ctx.subsets("in")?,
        })
    }

    fn compute(inputs: &SetInputs) -> FlowResult<SubsetPackage>;
}

fn check_compatible(a: &SubsetPackage, b: &SubsetPackage) -> FlowResult<()> {
    if a.is_compatible(b) {
        return Ok(());
    }
    let name = |p: &SubsetPackage| {
        p.dataset()
            .map(|d| d.name().to_string())
            .unwrap_or_default()
    };
    Err(FlowError::DatasetMismatch(format!(
        "cannot combine subsets of '{}' and '{}'",
        name(a),
        name(b)
    )))
}

/// The package an output takes its dataset from: the first input with items,
/// else the first input that has a dataset at all.
fn anchor<'a>(inputs: &[&'a SubsetPackage]) -> Option<&'a SubsetPackage> {
    inputs
        .iter()
        .find(|p| !p.is_empty())
        .or_else(|| inputs.iter().find(|p| !p.has_no_data()))
        .copied()
}

/// Items present in any input. Visuals merge in input order.
pub fn union(inputs: &[&SubsetPackage]) -> FlowResult<SubsetPackage> {
    let Some(anchor) = anchor(inputs) else {
        return Ok(SubsetPackage::new());
    };
    let mut out = anchor.emptied();
    for pack in inputs.iter().filter(|p| !p.is_empty()) {
        check_compatible(anchor, pack)?;
        for item in pack.items() {
            out.add_item(item.clone());
        }
    }
    Ok(out)
}

/// Items present in every input that has a dataset. Visuals of surviving
/// items merge in input order.
pub fn intersect(inputs: &[&SubsetPackage]) -> FlowResult<SubsetPackage> {
    let Some(anchor) = anchor(inputs) else {
        return Ok(SubsetPackage::new());
    };
    for pack in inputs.iter().filter(|p| !p.is_empty()) {
        check_compatible(anchor, pack)?;
    }
    let mut with_data = inputs.iter().filter(|p| !p.has_no_data());
    if with_data.clone().any(|p| p.is_empty()) {
        return Ok(anchor.emptied());
    }
    let mut out = SubsetPackage::new();
    if let Some(first) = with_data.next() {
        out.copy_from(first);
    }
    for pack in with_data {
        out.filter(pack.indices());
        for item in pack.items() {
            if let Some(existing) = out.get_item_mut(item.index) {
                existing.visuals.merge(&item.visuals);
            }
        }
    }
    Ok(out)
}

/// Items of `x` absent from every `ys` package.
///
/// An empty `x` or an empty `ys` returns a copy of `x`.
pub fn minus(x: &SubsetPackage, ys: &[&SubsetPackage]) -> FlowResult<SubsetPackage> {
    let mut out = SubsetPackage::new();
    out.copy_from(x);
    if x.is_empty() || ys.is_empty() {
        return Ok(out);
    }
    for y in ys.iter().filter(|p| !p.is_empty()) {
        check_compatible(x, y)?;
        for index in y.indices() {
            out.remove_item(index);
        }
    }
    Ok(out)
}

pub struct UnionStrategy;

impl SetStrategy for UnionStrategy {
    const NODE_TYPE: NodeType = NodeType::Union;
    const PORTS: &'static [PortDescriptor] = &[
        PortDescriptor::input_multiple("in", PackageKind::Subset),
        PortDescriptor::output("out", PackageKind::Subset),
    ];

    fn compute(inputs: &SetInputs) -> FlowResult<SubsetPackage> {
        union(&inputs.others)
    }
}

pub struct IntersectStrategy;

impl SetStrategy for IntersectStrategy {
    const NODE_TYPE: NodeType = NodeType::Intersect;
    const PORTS: &'static [PortDescriptor] = &[
        PortDescriptor::input_multiple("in", PackageKind::Subset),
        PortDescriptor::output("out", PackageKind::Subset),
    ];

    fn compute(inputs: &SetInputs) -> FlowResult<SubsetPackage> {
        intersect(&inputs.others)
    }
}

pub struct MinusStrategy;

impl SetStrategy for MinusStrategy {
    const NODE_TYPE: NodeType = NodeType::Minus;
    const PORTS: &'static [PortDescriptor] = &[
        PortDescriptor::input("inx", PackageKind::Subset),
        PortDescriptor::input_multiple("in", PackageKind::Subset),
        PortDescriptor::output("out", PackageKind::Subset),
    ];

    fn inputs<'a>(ctx: &NodeContext<'a>) -> FlowResult<SetInputs<'a>> {
        Ok(SetInputs {
            primary: Some(ctx.subset("inx")?),
            others: ctx.subsets("in")?,
        })
    }

    fn compute(inputs: &SetInputs) -> FlowResult<SubsetPackage> {
        match inputs.primary {
            Some(x) => minus(x, &inputs.others),
            None => Ok(SubsetPackage::new()),
        }
    }
}

/// A set operator node. Stateless apart from its strategy.
pub struct SetNode<S: SetStrategy> {
    _strategy: PhantomData<S>,
}

impl<S: SetStrategy> SetNode<S> {
    pub fn new() -> Self {
        Self {
            _strategy: PhantomData,
        }
    }
}

impl<S: SetStrategy> Default for SetNode<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SetStrategy> NodePlugin for SetNode<S> {
    fn name(&self) -> &str {
        S::NODE_TYPE.display_name()
    }

    fn ports(&self) -> &[PortDescriptor] {
        S::PORTS
    }

    fn process(&mut self, ctx: &mut NodeContext) -> FlowResult<ProcessOutcome> {
        let inputs = S::inputs(ctx)?;
        let out = S::compute(&inputs)?;
        ctx.set_output("out", out)?;
        Ok(ProcessOutcome::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SubsetItem, TabularDataset, VisualProperties};
    use std::sync::Arc;

    fn dataset() -> Arc<TabularDataset> {
        Arc::new(TabularDataset::parse_csv("rows", "v\n10\n20\n30\n").unwrap())
    }

    fn colored(dataset: &Arc<TabularDataset>, items: &[(usize, Option<&str>)]) -> SubsetPackage {
        let mut pack = SubsetPackage::with_dataset(dataset.clone());
        for (index, color) in items {
            let visuals = VisualProperties {
                color: color.map(String::from),
                ..Default::default()
            };
            pack.add_item(SubsetItem::with_visuals(*index, visuals));
        }
        pack
    }

    fn indices(pack: &SubsetPackage) -> Vec<usize> {
        pack.indices().collect()
    }

    fn color(pack: &SubsetPackage, index: usize) -> Option<&str> {
        pack.get_item(index).and_then(|i| i.visuals.color.as_deref())
    }

    #[test]
    fn test_scenario_from_two_packages() {
        let d = dataset();
        let a = colored(&d, &[(0, Some("red")), (1, None)]);
        let b = colored(&d, &[(1, Some("blue")), (2, None)]);

        let u = union(&[&a, &b]).unwrap();
        assert_eq!(indices(&u), vec![0, 1, 2]);
        assert_eq!(color(&u, 1), Some("blue"));
        assert_eq!(color(&u, 0), Some("red"));

        let i = intersect(&[&a, &b]).unwrap();
        assert_eq!(indices(&i), vec![1]);
        assert_eq!(color(&i, 1), Some("blue"));

        let m = minus(&a, &[&b]).unwrap();
        assert_eq!(indices(&m), vec![0]);
    }

    #[test]
    fn test_union_connection_order_decides_visuals() {
        let d = dataset();
        let a = colored(&d, &[(1, Some("red"))]);
        let b = colored(&d, &[(1, Some("blue"))]);
        assert_eq!(color(&union(&[&b, &a]).unwrap(), 1), Some("red"));
    }

    #[test]
    fn test_empty_inputs_are_skipped() {
        let d = dataset();
        let a = colored(&d, &[(0, None), (2, None)]);
        let empty = SubsetPackage::new();
        assert_eq!(indices(&union(&[&empty, &a]).unwrap()), vec![0, 2]);
        assert_eq!(indices(&intersect(&[&a, &empty]).unwrap()), vec![0, 2]);
        assert!(union(&[&empty, &empty]).unwrap().has_no_data());
    }

    #[test]
    fn test_intersect_with_empty_subset_of_same_rows() {
        let d = dataset();
        let a = colored(&d, &[(0, None), (1, None)]);
        let none = SubsetPackage::with_dataset(d.clone());
        for inputs in [[&a, &none], [&none, &a]] {
            let out = intersect(&inputs).unwrap();
            assert!(out.is_empty());
            assert!(!out.has_no_data());
        }
        assert_eq!(indices(&union(&[&none, &a]).unwrap()), vec![0, 1]);
    }

    #[test]
    fn test_all_empty_inputs_keep_dataset() {
        let d = dataset();
        let none = SubsetPackage::with_dataset(d.clone());
        let detached = SubsetPackage::new();
        for out in [
            union(&[&detached, &none]).unwrap(),
            intersect(&[&none, &detached, &none]).unwrap(),
        ] {
            assert!(out.is_empty());
            assert!(out.dataset().is_some_and(|data| Arc::ptr_eq(data, &d)));
        }
    }

    #[test]
    fn test_minus_short_circuits() {
        let d = dataset();
        let x = colored(&d, &[(0, None), (1, None)]);
        assert_eq!(minus(&x, &[]).unwrap(), x);
        assert!(minus(&SubsetPackage::new(), &[&x]).unwrap().is_empty());
    }

    #[test]
    fn test_mismatched_datasets_rejected() {
        let a = colored(&dataset(), &[(0, None)]);
        let other = Arc::new(TabularDataset::parse_csv("other", "w\n1\n").unwrap());
        let b = colored(&other, &[(0, None)]);
        assert!(matches!(union(&[&a, &b]), Err(FlowError::DatasetMismatch(_))));
        assert!(matches!(intersect(&[&a, &b]), Err(FlowError::DatasetMismatch(_))));
        assert!(matches!(minus(&a, &[&b]), Err(FlowError::DatasetMismatch(_))));
    }

    #[test]
    fn test_intersect_does_not_alias_first_input() {
        let d = dataset();
        let a = colored(&d, &[(0, None), (1, None)]);
        let b = colored(&d, &[(1, Some("blue"))]);
        let _ = intersect(&[&a, &b]).unwrap();
        assert_eq!(a.num_items(), 2);
        assert_eq!(color(&a, 1), None);
    }
}
